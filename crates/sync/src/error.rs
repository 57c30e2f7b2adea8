//! Error types for the sync crate.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// A single submission attempt's failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("Server returned status {status}: {body}")]
    Server { status: u16, body: String },

    /// The endpoint answered but the body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The endpoint could not be constructed.
    #[error("Endpoint configuration error: {0}")]
    Config(String),
}

/// Why a sync cycle did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A sync was requested while offline.
    #[error("Cannot sync while offline")]
    Offline,

    /// Connectivity dropped while the cycle was running.
    #[error("Connection lost during sync")]
    ConnectionLost,

    /// Every allowed attempt failed.
    #[error("Sync failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        attempts: u32,
        last_error: EndpointError,
    },

    /// The cycle was abandoned by an explicit state reset.
    #[error("Sync cycle was reset")]
    Reset,

    /// Automatic sync needs a Tokio runtime to schedule its work.
    #[error("No async runtime available: {0}")]
    Runtime(String),
}
