use std::path::PathBuf;

use thiserror::Error;

use crate::config::db::DriverKind;

#[derive(Debug, Error)]
pub enum DbInfraError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration error: cannot create store directory {}: {source}", path.display())]
    StoreDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Connectivity error ({backend}): {detail}")]
    Connectivity { backend: DriverKind, detail: String },

    #[error("Remote store unavailable ({remote}); local fallback failed ({local})")]
    FallbackExhausted { remote: String, local: String },

    #[error("Store creation error: {message}")]
    StoreCreation { message: String },
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn store_creation(message: impl Into<String>) -> Self {
        Self::StoreCreation {
            message: message.into(),
        }
    }

    /// Configuration failures are fatal before any probe runs; everything else
    /// is a connectivity or engine failure.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::StoreDir { .. })
    }
}
