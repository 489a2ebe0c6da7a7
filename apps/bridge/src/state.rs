use sea_orm::DatabaseConnection;
use store_infra::{ReadyStore, StoreStatus};

/// Shared per-worker state: the session-store handle and how it was chosen.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub status: StoreStatus,
}

impl AppState {
    pub fn new(db: DatabaseConnection, status: StoreStatus) -> Self {
        Self { db, status }
    }
}

impl From<ReadyStore> for AppState {
    fn from(ready: ReadyStore) -> Self {
        Self::new(ready.handle, ready.status)
    }
}
