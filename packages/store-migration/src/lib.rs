//! Session-store schema for the embedded (SQLite) backend.
//!
//! The remote backend is provisioned out of band; this crate only creates the
//! tables the bridge's protocol client expects when it falls back to a local
//! file.

pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;
pub use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseConnection};

mod m20250301_000001_session_store; // keep filename + module name in sync

/// Table the protocol client's device store lives in. Probes and the column
/// reconciler key off this name.
pub const DEVICE_TABLE: &str = "whatsmeow_device";

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_000001_session_store::Migration)]
    }
}

/// Apply every pending migration and log before/after counts.
pub async fn migrate_up(db: &DatabaseConnection) -> Result<(), DbErr> {
    let before = get_db_diagnostics(db).await?;

    tracing::info!(
        profile = %before.profile,
        database = %before.name,
        defined = before.defined_migrations_count,
        applied = before.mig_count,
        "migrate=start"
    );

    match Migrator::up(db, None).await {
        Ok(()) => {
            let after = count_applied_migrations(db).await.unwrap_or(0);
            tracing::info!(profile = %before.profile, applied = after, "migrate=done");
            Ok(())
        }
        Err(e) => {
            tracing::error!(profile = %before.profile, error = %e, "migrate=failed");
            Err(e)
        }
    }
}

#[derive(Debug)]
struct DbDiagnostics {
    profile: String,
    name: String,
    mig_count: usize,
    defined_migrations_count: usize,
}

async fn get_db_diagnostics(db: &DatabaseConnection) -> Result<DbDiagnostics, DbErr> {
    let backend = db.get_database_backend();
    let profile = format!("{backend:?}");

    let name = match backend {
        sea_orm_migration::sea_orm::DatabaseBackend::Postgres => {
            let stmt = Statement::from_string(backend, "select current_database() as name");
            match db.query_one(stmt).await? {
                Some(row) => row.try_get("", "name")?,
                None => "<unknown>".to_string(),
            }
        }
        sea_orm_migration::sea_orm::DatabaseBackend::Sqlite => {
            let stmt = Statement::from_string(
                backend,
                "SELECT file FROM pragma_database_list WHERE name = 'main'",
            );
            match db.query_one(stmt).await? {
                Some(row) => match row.try_get::<String>("", "file") {
                    Ok(file) if file.is_empty() => ":memory:".to_string(),
                    Ok(file) => file,
                    Err(_) => "<unknown>".to_string(),
                },
                None => "<unknown>".to_string(),
            }
        }
        _ => "<unsupported>".to_string(),
    };

    Ok(DbDiagnostics {
        profile,
        name,
        mig_count: count_applied_migrations(db).await.unwrap_or(0),
        defined_migrations_count: Migrator::migrations().len(),
    })
}

/// Count applied migrations. Returns 0 if the migration table doesn't exist yet.
pub async fn count_applied_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    match Migrator::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.len()),
        Err(DbErr::Exec(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use sea_orm_migration::sea_orm::{Database, DatabaseBackend, Statement};

    use super::*;

    async fn table_names(db: &DatabaseConnection) -> Vec<String> {
        let rows = db
            .query_all(Statement::from_string(
                DatabaseBackend::Sqlite,
                "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            ))
            .await
            .expect("list tables");
        rows.iter()
            .map(|r| r.try_get::<String>("", "name").expect("name column"))
            .collect()
    }

    #[tokio::test]
    async fn migrate_up_creates_session_tables() {
        let db = Database::connect("sqlite::memory:").await.expect("connect");

        migrate_up(&db).await.expect("migrate up");

        let tables = table_names(&db).await;
        assert!(tables.contains(&DEVICE_TABLE.to_string()));
        assert!(tables.contains(&"whatsmeow_sessions".to_string()));
        assert_eq!(count_applied_migrations(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn migrate_up_is_repeatable() {
        let db = Database::connect("sqlite::memory:").await.expect("connect");

        migrate_up(&db).await.expect("first run");
        migrate_up(&db).await.expect("second run");

        assert_eq!(count_applied_migrations(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn count_is_zero_before_first_run() {
        let db = Database::connect("sqlite::memory:").await.expect("connect");
        assert_eq!(count_applied_migrations(&db).await.unwrap(), 0);
    }
}
