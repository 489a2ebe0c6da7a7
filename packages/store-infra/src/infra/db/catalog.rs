//! Read-only catalog lookups shared by the probe and the reconciler.

use sea_orm::{ConnectionTrait, DatabaseBackend, DbErr, Statement, Value};

fn unsupported() -> DbErr {
    DbErr::Custom("MySQL is not a supported store backend".to_string())
}

async fn count<C: ConnectionTrait>(conn: &C, stmt: Statement) -> Result<i64, DbErr> {
    match conn.query_one(stmt).await? {
        Some(row) => row.try_get::<i64>("", "cnt"),
        None => Ok(0),
    }
}

/// Whether `table` is visible on the connection's search path (Postgres) or
/// in the main database (SQLite).
pub async fn table_exists<C: ConnectionTrait>(conn: &C, table: &str) -> Result<bool, DbErr> {
    let backend = conn.get_database_backend();
    let values: [Value; 1] = [table.into()];
    let stmt = match backend {
        DatabaseBackend::Postgres => Statement::from_sql_and_values(
            backend,
            r#"SELECT COUNT(*) AS cnt FROM information_schema.tables
               WHERE table_schema = ANY (current_schemas(false)) AND table_name = $1"#,
            values,
        ),
        DatabaseBackend::Sqlite => Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table' AND name = ?",
            values,
        ),
        DatabaseBackend::MySql => return Err(unsupported()),
    };
    Ok(count(conn, stmt).await? > 0)
}

pub async fn column_exists<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
) -> Result<bool, DbErr> {
    let backend = conn.get_database_backend();
    let values: [Value; 2] = [table.into(), column.into()];
    let stmt = match backend {
        DatabaseBackend::Postgres => Statement::from_sql_and_values(
            backend,
            r#"SELECT COUNT(*) AS cnt FROM information_schema.columns
               WHERE table_schema = ANY (current_schemas(false))
                 AND table_name = $1 AND column_name = $2"#,
            values,
        ),
        DatabaseBackend::Sqlite => Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(*) AS cnt FROM pragma_table_info(?) WHERE name = ?",
            values,
        ),
        DatabaseBackend::MySql => return Err(unsupported()),
    };
    Ok(count(conn, stmt).await? > 0)
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;

    use super::*;

    #[tokio::test]
    async fn sqlite_lookups_see_tables_and_columns() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.execute_unprepared("CREATE TABLE whatsmeow_device (jid TEXT PRIMARY KEY, push_name TEXT)")
            .await
            .unwrap();

        assert!(table_exists(&db, "whatsmeow_device").await.unwrap());
        assert!(!table_exists(&db, "whatsmeow_sessions").await.unwrap());
        assert!(column_exists(&db, "whatsmeow_device", "push_name").await.unwrap());
        assert!(!column_exists(&db, "whatsmeow_device", "facebook_uuid").await.unwrap());
        assert!(!column_exists(&db, "missing_table", "jid").await.unwrap());
    }
}
