//! Error types for veil-storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record under key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: veil_core::Error,
    },

    #[error("Storage backend unavailable: {0}")]
    Backend(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
