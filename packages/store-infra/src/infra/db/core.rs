use std::process;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::db::{resolve, resolve_local, DatabaseConfig, DbEnv, DriverKind};
use crate::error::DbInfraError;
use crate::infra::db::diagnostics::{report, sanitize_db_url, ConnectionInfo};
use crate::infra::db::probe::{ConnectionProbe, SqlProbe};
use crate::infra::db::reconcile::{ReconcileReport, SchemaReconciler};
use crate::infra::db::store::{SeaOrmStoreFactory, StoreFactory};

/// Where initialization currently stands.
///
/// `Unconfigured -> ProbingRemote -> {SchemaReconciling -> Ready} | ProbingLocal -> {Ready | Fatal}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterPhase {
    Unconfigured,
    ProbingRemote,
    ProbingLocal,
    SchemaReconciling,
    Ready,
    Fatal,
}

impl AdapterPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, AdapterPhase::Ready | AdapterPhase::Fatal)
    }
}

/// What the adapter keeps after `Ready`: enough to explain the outcome.
#[derive(Debug, Clone)]
pub struct StoreStatus {
    config: DatabaseConfig,
    remote_failure: Option<String>,
    reconcile: Option<ReconcileReport>,
    phases: Vec<AdapterPhase>,
}

/// Serializable status for the HTTP layer. Flattens the redacted connection
/// info and adds why a fallback happened, if it did.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub connection: ConnectionInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<ReconcileReport>,
    pub phases: Vec<AdapterPhase>,
}

impl StoreStatus {
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.config.driver_kind()
    }

    /// Redacted reason the remote backend was abandoned.
    pub fn remote_failure(&self) -> Option<&str> {
        self.remote_failure.as_deref()
    }

    pub fn reconcile_report(&self) -> Option<&ReconcileReport> {
        self.reconcile.as_ref()
    }

    pub fn phases(&self) -> &[AdapterPhase] {
        &self.phases
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        report(Some(&self.config))
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            connection: self.connection_info(),
            fallback_reason: self.remote_failure.clone(),
            schema: self.reconcile.clone(),
            phases: self.phases.clone(),
        }
    }
}

/// Result of a successful initialization.
#[derive(Debug)]
pub struct ReadyStore {
    pub handle: DatabaseConnection,
    pub status: StoreStatus,
}

/// Owned initialization state. Runs the probe/fallback protocol exactly once.
pub struct DbAdapter<P = SqlProbe, F = SeaOrmStoreFactory> {
    probe: P,
    factory: F,
    reconciler: SchemaReconciler,
    phase: AdapterPhase,
    history: Vec<AdapterPhase>,
    active: Option<DatabaseConfig>,
}

impl DbAdapter<SqlProbe, SeaOrmStoreFactory> {
    /// Production wiring: real probe with the env's timeout, sea-orm pools.
    pub fn from_env(env: &DbEnv) -> Self {
        Self::new(
            SqlProbe::new(env.probe_timeout()),
            SeaOrmStoreFactory::default(),
        )
    }
}

impl<P, F> DbAdapter<P, F>
where
    P: ConnectionProbe,
    F: StoreFactory,
{
    pub fn new(probe: P, factory: F) -> Self {
        Self {
            probe,
            factory,
            reconciler: SchemaReconciler::default(),
            phase: AdapterPhase::Unconfigured,
            history: vec![AdapterPhase::Unconfigured],
            active: None,
        }
    }

    pub fn with_reconciler(mut self, reconciler: SchemaReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn phase(&self) -> AdapterPhase {
        self.phase
    }

    pub fn history(&self) -> &[AdapterPhase] {
        &self.history
    }

    /// Redacted view of the active backend; uninitialized until `Ready`.
    pub fn connection_info(&self) -> ConnectionInfo {
        report(self.active.as_ref())
    }

    /// Run the state machine to `Ready` or `Fatal`. A second call is an error.
    pub async fn initialize(&mut self, env: &DbEnv) -> Result<ReadyStore, DbInfraError> {
        if self.phase != AdapterPhase::Unconfigured {
            return Err(DbInfraError::config(format!(
                "store adapter already ran (phase={:?})",
                self.phase
            )));
        }

        info!("bootstrap=start pid={}", process::id());

        let result = self.run(env).await;
        match &result {
            Ok(ready) => info!(
                backend = %ready.status.driver_kind(),
                fell_back = ready.status.remote_failure.is_some(),
                "bootstrap=ready"
            ),
            Err(e) => {
                self.transition(AdapterPhase::Fatal);
                error!(error = %e, "bootstrap=fatal");
            }
        }
        result
    }

    fn transition(&mut self, next: AdapterPhase) {
        debug!(from = ?self.phase, to = ?next, "bootstrap=transition");
        self.phase = next;
        self.history.push(next);
    }

    async fn run(&mut self, env: &DbEnv) -> Result<ReadyStore, DbInfraError> {
        // Config errors surface before any connection is attempted.
        let initial = resolve(env)?;

        if !initial.is_remote() {
            return self.probe_local(initial, None).await;
        }

        self.transition(AdapterPhase::ProbingRemote);
        info!(
            url = %sanitize_db_url(initial.connection_address()),
            "bootstrap=probe target=remote"
        );

        let probe = self.probe.test(&initial).await;
        if probe.is_usable() {
            return self.finish_remote(initial).await;
        }

        // Never a second remote attempt: Local is used for the process lifetime.
        let remote_detail = probe.detail().to_string();
        warn!(detail = %remote_detail, "bootstrap=fallback target=local");

        let local = resolve_local(env)?;
        self.probe_local(local, Some(remote_detail)).await
    }

    async fn probe_local(
        &mut self,
        config: DatabaseConfig,
        remote_failure: Option<String>,
    ) -> Result<ReadyStore, DbInfraError> {
        self.transition(AdapterPhase::ProbingLocal);
        info!(path = %config.connection_address(), "bootstrap=probe target=local");

        let probe = self.probe.test(&config).await;
        if !probe.is_usable() {
            let local_detail = probe.detail().to_string();
            return Err(match remote_failure {
                Some(remote) => DbInfraError::FallbackExhausted {
                    remote,
                    local: local_detail,
                },
                None => DbInfraError::Connectivity {
                    backend: DriverKind::Local,
                    detail: local_detail,
                },
            });
        }

        // a ping can pass on a file the engine later rejects
        let handle = match self.factory.create(&config).await {
            Ok(handle) => handle,
            Err(e) => {
                return Err(match remote_failure {
                    Some(remote) => DbInfraError::FallbackExhausted {
                        remote,
                        local: e.to_string(),
                    },
                    None => e,
                })
            }
        };
        Ok(self.ready(config, handle, remote_failure, None))
    }

    async fn finish_remote(&mut self, config: DatabaseConfig) -> Result<ReadyStore, DbInfraError> {
        self.transition(AdapterPhase::SchemaReconciling);

        let admin = self.factory.open_admin(&config).await?;
        let report = self.reconciler.reconcile(&admin).await;
        if let Err(e) = admin.close().await {
            debug!(error = %e, "admin connection close returned error");
        }

        let handle = self.factory.create(&config).await?;
        Ok(self.ready(config, handle, None, Some(report)))
    }

    fn ready(
        &mut self,
        config: DatabaseConfig,
        handle: DatabaseConnection,
        remote_failure: Option<String>,
        reconcile: Option<ReconcileReport>,
    ) -> ReadyStore {
        self.transition(AdapterPhase::Ready);
        self.active = Some(config.clone());

        ReadyStore {
            handle,
            status: StoreStatus {
                config,
                remote_failure,
                reconcile,
                phases: self.history.clone(),
            },
        }
    }
}

/// One-shot startup entrypoint used by the binary.
pub async fn bootstrap_store(env: &DbEnv) -> Result<ReadyStore, DbInfraError> {
    DbAdapter::from_env(env).initialize(env).await
}
