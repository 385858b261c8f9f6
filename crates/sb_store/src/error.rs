//! Error types for the memory store.

use thiserror::Error;

/// Memory store operation result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the memory store.
///
/// Variants line up with the error kinds a caller needs to distinguish:
/// bad input, an unavailable collaborator, a retryable backend hiccup, a
/// stored-data problem, or a concurrency conflict.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLx error (connection, query, migration).
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Serialization of metadata/embeddings failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller supplied an invalid collection name, insight type, or other
    /// identifier that failed allow-list validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The embedder collaborator is unavailable; caller asked for a
    /// semantic search but only text search can be served.
    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    /// A stored embedding or fingerprint had the wrong shape.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
}

impl StoreError {
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
