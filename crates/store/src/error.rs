//! Error types for storage operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid record in {set}: {reason}")]
    InvalidRecord { set: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
