//! Long-lived storage handles.
//!
//! Concurrency safety is the pool's job: the handle returned by `create` is
//! cloned freely by request handlers and no extra locking is layered on top.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection,
    SqlxPostgresConnector, SqlxSqliteConnector, Statement,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, trace};

use crate::config::db::{DatabaseConfig, DriverKind};
use crate::error::DbInfraError;
use crate::infra::db::diagnostics::{connection_id, scrub_secret};

/// Seam the adapter uses to obtain handles, so the state machine can be
/// exercised without a live Postgres.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Single-connection handle used for schema reconciliation before the
    /// shared pool exists.
    async fn open_admin(&self, config: &DatabaseConfig)
        -> Result<DatabaseConnection, DbInfraError>;

    /// The shared handle the rest of the process depends on.
    async fn create(&self, config: &DatabaseConfig) -> Result<DatabaseConnection, DbInfraError>;
}

const ADMIN_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub pool_min: u32,
    pub pool_max: u32,
    pub acquire_timeout_ms: u64,
    pub sqlite_busy_timeout_ms: u64,
    pub app_name: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            pool_min: 1,
            pool_max: 10,
            acquire_timeout_ms: 5_000,
            sqlite_busy_timeout_ms: 5_000,
            app_name: "whatsapp-bridge".to_string(),
        }
    }
}

/// Options for the Local file. Built from the path so `?`, `#` and `%` in the
/// store dir stay literal.
pub(crate) fn sqlite_connect_options(
    config: &DatabaseConfig,
) -> Result<SqliteConnectOptions, DbInfraError> {
    let path = config.local_path().ok_or_else(|| {
        DbInfraError::store_creation(format!("{} config has no SQLite path", config.driver_kind()))
    })?;
    Ok(SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true))
}

/// Ordered per-connection statements for the given backend.
fn build_session_statements(kind: DriverKind, settings: &ConnectionSettings) -> Vec<String> {
    match kind {
        DriverKind::Local => vec![
            "PRAGMA foreign_keys = ON;".to_string(),
            format!("PRAGMA busy_timeout = {};", settings.sqlite_busy_timeout_ms),
        ],
        DriverKind::Remote => vec![
            // application_name is safe to single-quote; minimal escaping
            format!(
                "SET application_name = '{}';",
                settings.app_name.replace('\'', "''")
            ),
            "SET timezone = 'UTC';".to_string(),
        ],
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeaOrmStoreFactory {
    settings: ConnectionSettings,
}

impl SeaOrmStoreFactory {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    async fn create_sqlite(
        &self,
        config: &DatabaseConfig,
    ) -> Result<DatabaseConnection, DbInfraError> {
        let connect_opts = sqlite_connect_options(config)?;

        let statements = build_session_statements(DriverKind::Local, &self.settings);
        let pool = SqlitePoolOptions::new()
            .min_connections(self.settings.pool_min)
            .max_connections(self.settings.pool_max)
            .acquire_timeout(Duration::from_millis(self.settings.acquire_timeout_ms))
            .after_connect(move |conn, _meta| {
                let statements = statements.clone();
                Box::pin(async move {
                    for stmt in statements {
                        sqlx::query(&stmt).execute(&mut *conn).await?;
                    }
                    trace!("db=sqlite hook=after_connect ok");
                    Ok::<_, sqlx::Error>(())
                })
            })
            .connect_with(connect_opts)
            .await
            .map_err(|e| {
                DbInfraError::store_creation(format!("failed to create SQLite pool: {e}"))
            })?;

        let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);

        setup_sqlite_file_prerequisites(&db).await?;

        // The embedded engine owns its table shape.
        store_migration::migrate_up(&db)
            .await
            .map_err(|e| DbInfraError::store_creation(format!("session-store migration failed: {e}")))?;

        info!(
            engine = "sqlite",
            path = %config.connection_address(),
            pool_id = %connection_id(&db),
            min = self.settings.pool_min,
            max = self.settings.pool_max,
            "pool=create"
        );
        Ok(db)
    }

    async fn create_postgres(
        &self,
        config: &DatabaseConfig,
    ) -> Result<DatabaseConnection, DbInfraError> {
        let statements = build_session_statements(DriverKind::Remote, &self.settings);
        let pool = PgPoolOptions::new()
            .min_connections(self.settings.pool_min)
            .max_connections(self.settings.pool_max)
            .acquire_timeout(Duration::from_millis(self.settings.acquire_timeout_ms))
            .idle_timeout(Duration::from_secs(30))
            .after_connect(move |conn, _meta| {
                let statements = statements.clone();
                Box::pin(async move {
                    for stmt in statements {
                        sqlx::query(&stmt).execute(&mut *conn).await?;
                    }
                    Ok::<_, sqlx::Error>(())
                })
            })
            .connect(config.connection_address())
            .await
            .map_err(|e| {
                DbInfraError::store_creation(scrub_secret(
                    &format!("failed to create Postgres pool: {e}"),
                    config,
                ))
            })?;

        let db = SqlxPostgresConnector::from_sqlx_postgres_pool(pool);

        // warm-up so a broken pool fails here rather than on the first request
        db.execute(Statement::from_string(DatabaseBackend::Postgres, "SELECT 1"))
            .await
            .map_err(|e| {
                DbInfraError::store_creation(scrub_secret(&format!("warmup query failed: {e}"), config))
            })?;

        info!(
            engine = "postgres",
            pool_id = %connection_id(&db),
            min = self.settings.pool_min,
            max = self.settings.pool_max,
            "pool=create"
        );
        Ok(db)
    }
}

#[async_trait]
impl StoreFactory for SeaOrmStoreFactory {
    async fn open_admin(
        &self,
        config: &DatabaseConfig,
    ) -> Result<DatabaseConnection, DbInfraError> {
        if config.driver_kind() == DriverKind::Local {
            let pool = SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .acquire_timeout(ADMIN_ACQUIRE_TIMEOUT)
                .connect_with(sqlite_connect_options(config)?)
                .await
                .map_err(|e| {
                    DbInfraError::store_creation(format!("failed to open admin connection: {e}"))
                })?;
            return Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool));
        }

        let mut opt = ConnectOptions::new(config.connection_address());
        opt.min_connections(1)
            .max_connections(1)
            .acquire_timeout(ADMIN_ACQUIRE_TIMEOUT)
            .sqlx_logging(false);

        Database::connect(opt).await.map_err(|e| {
            DbInfraError::store_creation(scrub_secret(
                &format!("failed to open admin connection: {e}"),
                config,
            ))
        })
    }

    async fn create(&self, config: &DatabaseConfig) -> Result<DatabaseConnection, DbInfraError> {
        match config.driver_kind() {
            DriverKind::Local => self.create_sqlite(config).await,
            DriverKind::Remote => self.create_postgres(config).await,
        }
    }
}

async fn setup_sqlite_file_prerequisites(db: &DatabaseConnection) -> Result<(), DbInfraError> {
    for pragma in ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"] {
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, pragma))
            .await
            .map_err(|e| DbInfraError::store_creation(format!("{pragma} failed: {e}")))?;
    }
    Ok(())
}
