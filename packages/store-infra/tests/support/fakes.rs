//! Stand-ins for the probe and factory seams.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use store_infra::infra::db::{
    ConnectionProbe, ConnectionProbeResult, SeaOrmStoreFactory, StoreFactory,
};
use store_infra::{DatabaseConfig, DbInfraError, DriverKind};

pub type CallLog = Arc<Mutex<Vec<DriverKind>>>;

/// Returns a fixed answer per backend and records every call in order.
pub struct ScriptedProbe {
    remote: ConnectionProbeResult,
    local: ConnectionProbeResult,
    calls: CallLog,
}

impl ScriptedProbe {
    pub fn new(remote: ConnectionProbeResult, local: ConnectionProbeResult) -> Self {
        Self {
            remote,
            local,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ConnectionProbe for ScriptedProbe {
    async fn test(&self, config: &DatabaseConfig) -> ConnectionProbeResult {
        self.calls.lock().unwrap().push(config.driver_kind());
        match config.driver_kind() {
            DriverKind::Remote => self.remote.clone(),
            DriverKind::Local => self.local.clone(),
        }
    }
}

pub fn logged(calls: &CallLog) -> Vec<DriverKind> {
    calls.lock().unwrap().clone()
}

/// Serves "remote" handles from a SQLite file so the remote path (admin
/// handle + reconciliation + shared handle) runs without a Postgres server.
pub struct FileBackedFactory {
    remote_file: PathBuf,
    local: SeaOrmStoreFactory,
}

impl FileBackedFactory {
    pub fn new(remote_file: &Path) -> Self {
        Self {
            remote_file: remote_file.to_path_buf(),
            local: SeaOrmStoreFactory::default(),
        }
    }

    async fn open_file(&self) -> Result<DatabaseConnection, DbInfraError> {
        let url = format!("sqlite://{}?mode=rwc", self.remote_file.display());
        Database::connect(url)
            .await
            .map_err(|e| DbInfraError::store_creation(e.to_string()))
    }
}

#[async_trait]
impl StoreFactory for FileBackedFactory {
    async fn open_admin(
        &self,
        config: &DatabaseConfig,
    ) -> Result<DatabaseConnection, DbInfraError> {
        match config.driver_kind() {
            DriverKind::Remote => self.open_file().await,
            DriverKind::Local => self.local.open_admin(config).await,
        }
    }

    async fn create(&self, config: &DatabaseConfig) -> Result<DatabaseConnection, DbInfraError> {
        match config.driver_kind() {
            DriverKind::Remote => self.open_file().await,
            DriverKind::Local => self.local.create(config).await,
        }
    }
}

/// Factory whose handle allocation always fails.
pub struct BrokenFactory;

#[async_trait]
impl StoreFactory for BrokenFactory {
    async fn open_admin(&self, _: &DatabaseConfig) -> Result<DatabaseConnection, DbInfraError> {
        Err(DbInfraError::store_creation("driver not registered"))
    }

    async fn create(&self, _: &DatabaseConfig) -> Result<DatabaseConnection, DbInfraError> {
        Err(DbInfraError::store_creation("driver not registered"))
    }
}

/// Device table as an older remote deployment left it: no `lid_migration_ts`.
pub async fn seed_outdated_device_table(path: &Path) {
    let db = Database::connect(format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("open seed file");
    db.execute_unprepared(
        "CREATE TABLE whatsmeow_device (jid TEXT PRIMARY KEY, facebook_uuid TEXT, push_name TEXT NOT NULL DEFAULT '')",
    )
    .await
    .expect("create device table");
    db.close().await.expect("close seed handle");
}
