pub mod catalog;
pub mod core;
pub mod diagnostics;
pub mod probe;
pub mod reconcile;
pub mod store;

pub use self::core::{
    bootstrap_store, AdapterPhase, DbAdapter, ReadyStore, StatusSnapshot, StoreStatus,
};
pub use diagnostics::{report, sanitize_db_url, BackendKind, ConnectionInfo};
pub use probe::{ConnectionProbe, ConnectionProbeResult, SqlProbe};
pub use reconcile::{
    ReconcileReport, SchemaColumnRequirement, SchemaDriftWarning, SchemaReconciler,
    COLUMN_REQUIREMENTS,
};
pub use store::{ConnectionSettings, SeaOrmStoreFactory, StoreFactory};
