//! The error taxonomy every tool response surfaces as a single tag
//! alongside its message. Individual crates keep their own `thiserror`
//! enums; this is the coarse classification a handler maps them onto
//! before putting them on the wire.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input the caller should fix: invalid path, disallowed
    /// command, invalid prune-delay, out-of-range config.
    Validation,
    /// A collaborator (embedder, cloud library, HTTP sink) is down;
    /// recovered locally where a fallback exists.
    Availability,
    /// Network/IO failure expected to clear up; recovered locally with
    /// backoff up to a retry budget.
    Transient,
    /// Corrupt stored data or malformed JSON; recovered where a default
    /// applies, surfaced otherwise.
    Data,
    /// A worker task failed; surfaced through that task's result, not
    /// the pool itself.
    Concurrency,
    /// Unrecoverable: could not open the database, could not register a
    /// required collaborator.
    Fatal,
}

/// A typed error field for a tool response -- never a "successful"
/// response shape with a hidden error buried in its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}
