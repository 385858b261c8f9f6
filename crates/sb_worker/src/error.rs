//! Error types for worker pools and routing.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("task timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("pool '{0}' not found")]
    PoolNotFound(String),

    #[error("pool '{0}' already exists")]
    PoolAlreadyExists(String),

    #[error("no pools are registered")]
    NoPoolsAvailable,

    #[error("unknown routing strategy '{0}'")]
    UnknownRoutingStrategy(String),

    #[error("pool is shutting down")]
    PoolShuttingDown,

    #[error("task execution failed: {0}")]
    TaskFailed(String),
}
