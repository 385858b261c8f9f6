//! Errors raised by git-aware operations.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("{0} is not a git repository")]
    NotARepository(PathBuf),

    #[error("git command rejected: {0}")]
    Command(#[from] sb_security::CommandError),

    #[error("path validation failed: {0}")]
    Path(#[from] sb_security::PathError),

    #[error("failed to decode git output as utf-8")]
    InvalidUtf8,

    #[error("invalid prune delay `{0}`: {1}")]
    InvalidPruneDelay(String, String),

    #[error("git exited with an error: {0}")]
    GitFailed(String),
}
