//! Session-store connectivity for the bridge: picks Postgres or the local
//! SQLite fallback at startup, checks it, and hands back a ready handle.

pub mod config;
pub mod error;
pub mod infra;

pub use config::db::{resolve, resolve_local, DatabaseConfig, DbEnv, DriverKind};
pub use error::DbInfraError;
pub use infra::db::{
    bootstrap_store, report, sanitize_db_url, AdapterPhase, ConnectionInfo, DbAdapter,
    ReadyStore, StatusSnapshot, StoreStatus,
};
