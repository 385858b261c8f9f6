//! Error types for path validation and subprocess execution.

use std::path::PathBuf;

/// Errors raised while validating a user- or tool-supplied path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("path contains a null byte")]
    NullByte,

    #[error("path length {0} exceeds the maximum of {1}")]
    TooLong(usize, usize),

    #[error("failed to resolve path {0}: {1}")]
    Unresolvable(PathBuf, std::io::Error),

    #[error("path {0} escapes base directory {1}")]
    Traversal(PathBuf, PathBuf),

    #[error("path {0} does not exist")]
    NotFound(PathBuf),

    #[error("path {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("path {0} contains a `.git` segment that is not the final component")]
    GitSegmentNotFinal(PathBuf),
}

/// Errors raised while validating or running an external command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command argv is empty")]
    EmptyArgv,

    #[error("command `{0}` is not in the allow-list")]
    NotAllowed(String),

    #[error("argument `{arg}` contains disallowed shell metacharacter `{ch}`")]
    ShellMetacharacter { arg: String, ch: char },

    #[error("failed to spawn `{0}`: {1}")]
    Spawn(String, std::io::Error),

    #[error("process wait failed: {0}")]
    Wait(std::io::Error),
}
