use crate::domain::models::AdapterState;
use thiserror::Error;

/// Failures reported by a radio adapter implementation.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// No usable radio on this machine (missing hardware or driver).
    #[error("bluetooth adapter unavailable: {0}")]
    Unavailable(String),
    /// Wrapper around OS-level errors.
    #[error("bluetooth platform error: {0}")]
    Platform(String),
    /// The adapter has been shut down and no longer accepts requests.
    #[error("bluetooth adapter closed")]
    Closed,
}

/// Failures writing to the durable key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ManagerError {
    /// The operation needs the radio powered on.
    #[error("adapter not ready (state: {0})")]
    AdapterNotReady(AdapterState),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
