//! Additive, idempotent column corrections for the remote session store.
//!
//! The remote database is provisioned out of band and can lag behind the
//! protocol client's expectations. Each requirement is a check-then-add step;
//! new requirements are appended to `COLUMN_REQUIREMENTS`, never edited.

use sea_orm::{ConnectionTrait, DbErr};
use serde::Serialize;
use store_migration::DEVICE_TABLE;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infra::db::catalog;

/// One additive correction: `ALTER TABLE table ADD COLUMN column sql_type [DEFAULT ..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaColumnRequirement {
    pub table: &'static str,
    pub column: &'static str,
    pub sql_type: &'static str,
    pub default_expression: Option<&'static str>,
}

impl SchemaColumnRequirement {
    pub const fn new(
        table: &'static str,
        column: &'static str,
        sql_type: &'static str,
        default_expression: Option<&'static str>,
    ) -> Self {
        Self {
            table,
            column,
            sql_type,
            default_expression,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    fn alter_sql(&self) -> String {
        let mut sql = format!(
            r#"ALTER TABLE "{}" ADD COLUMN "{}" {}"#,
            self.table, self.column, self.sql_type
        );
        if let Some(default) = self.default_expression {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

pub const COLUMN_REQUIREMENTS: &[SchemaColumnRequirement] = &[
    SchemaColumnRequirement::new(DEVICE_TABLE, "facebook_uuid", "TEXT", None),
    SchemaColumnRequirement::new(DEVICE_TABLE, "lid_migration_ts", "BIGINT", Some("0")),
];

/// A correction that could not be applied. Non-fatal; surfaced in the report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("schema drift on {table}.{column}: {detail}")]
pub struct SchemaDriftWarning {
    pub table: String,
    pub column: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub already_present: Vec<String>,
    pub warnings: Vec<SchemaDriftWarning>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn changed(&self) -> bool {
        !self.added.is_empty()
    }
}

enum StepOutcome {
    Added,
    Present,
}

#[derive(Debug, Clone)]
pub struct SchemaReconciler {
    steps: Vec<SchemaColumnRequirement>,
}

impl Default for SchemaReconciler {
    fn default() -> Self {
        Self::with_steps(COLUMN_REQUIREMENTS.to_vec())
    }
}

impl SchemaReconciler {
    pub fn with_steps(steps: Vec<SchemaColumnRequirement>) -> Self {
        Self { steps }
    }

    /// Apply every step. Failures become warnings; this never aborts.
    pub async fn reconcile<C: ConnectionTrait>(&self, conn: &C) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for step in &self.steps {
            let name = step.qualified_name();
            match apply_step(conn, step).await {
                Ok(StepOutcome::Added) => {
                    info!(column = %name, sql_type = step.sql_type, "reconcile=added");
                    report.added.push(name);
                }
                Ok(StepOutcome::Present) => {
                    debug!(column = %name, "reconcile=present");
                    report.already_present.push(name);
                }
                Err(e) => {
                    warn!(column = %name, error = %e, "reconcile=failed");
                    report.warnings.push(SchemaDriftWarning {
                        table: step.table.to_string(),
                        column: step.column.to_string(),
                        detail: e.to_string(),
                    });
                }
            }
        }

        info!(
            added = report.added.len(),
            present = report.already_present.len(),
            warnings = report.warnings.len(),
            "reconcile=done"
        );
        report
    }
}

async fn apply_step<C: ConnectionTrait>(
    conn: &C,
    step: &SchemaColumnRequirement,
) -> Result<StepOutcome, DbErr> {
    if catalog::column_exists(conn, step.table, step.column).await? {
        return Ok(StepOutcome::Present);
    }

    match conn.execute_unprepared(&step.alter_sql()).await {
        Ok(_) => Ok(StepOutcome::Added),
        // another process may have added it between the check and the ALTER
        Err(e) => match catalog::column_exists(conn, step.table, step.column).await {
            Ok(true) => Ok(StepOutcome::Present),
            _ => Err(e),
        },
    }
}
