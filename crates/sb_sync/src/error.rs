//! Error types for individual sync methods and the hybrid orchestrator.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// One method's failure. The hybrid orchestrator collects these (rather
/// than failing fast) so a caller can see every method it tried.
#[derive(Debug, Error, Clone)]
pub enum SyncError {
    #[error("invalid sync configuration: {0}")]
    Validation(String),

    #[error("cloud upload failed: {0}")]
    CloudUpload(String),

    #[error("http sync failed: {0}")]
    Http(String),

    #[error("sync method unavailable: {0}")]
    Unavailable(String),

    #[error("no sync method succeeded: {errors:?}")]
    Hybrid { errors: Vec<MethodFailure> },
}

/// A single method's name and the error it raised, accumulated by the
/// hybrid orchestrator across a priority chain.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MethodFailure {
    pub method: String,
    pub error: String,
}
