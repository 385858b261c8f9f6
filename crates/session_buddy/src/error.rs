//! Maps every collaborator crate's error type onto the coarse
//! [`ErrorKind`] tag a tool response puts on the wire.

use sb_protocol::{ErrorKind, ToolError};

pub trait IntoToolError {
    fn into_tool_error(self) -> ToolError;
}

impl IntoToolError for sb_store::StoreError {
    fn into_tool_error(self) -> ToolError {
        use sb_store::StoreError::*;
        let kind = match &self {
            InvalidIdentifier(_) => ErrorKind::Validation,
            NotFound(_) => ErrorKind::Data,
            EmbedderUnavailable(_) => ErrorKind::Availability,
            DataIntegrity(_) => ErrorKind::Data,
            Sqlx(_) | Serialization(_) => ErrorKind::Transient,
        };
        ToolError::new(kind, self.to_string())
    }
}

impl IntoToolError for sb_worker::WorkerError {
    fn into_tool_error(self) -> ToolError {
        use sb_worker::WorkerError::*;
        let kind = match &self {
            PoolNotFound(_) | PoolAlreadyExists(_) | UnknownRoutingStrategy(_) | NoPoolsAvailable => {
                ErrorKind::Validation
            }
            Timeout(_) | PoolShuttingDown => ErrorKind::Transient,
            TaskFailed(_) => ErrorKind::Concurrency,
        };
        ToolError::new(kind, self.to_string())
    }
}

impl IntoToolError for sb_git::GitError {
    fn into_tool_error(self) -> ToolError {
        use sb_git::GitError::*;
        let kind = match &self {
            NotARepository(_) | InvalidPruneDelay(_, _) | Path(_) => ErrorKind::Validation,
            Command(_) | GitFailed(_) | InvalidUtf8 => ErrorKind::Fatal,
        };
        ToolError::new(kind, self.to_string())
    }
}

impl IntoToolError for sb_sync::SyncError {
    fn into_tool_error(self) -> ToolError {
        use sb_sync::SyncError::*;
        let kind = match &self {
            Validation(_) => ErrorKind::Validation,
            Unavailable(_) => ErrorKind::Availability,
            CloudUpload(_) | Http(_) | Hybrid { .. } => ErrorKind::Transient,
        };
        ToolError::new(kind, self.to_string())
    }
}

impl IntoToolError for sb_evolution::EvolutionError {
    fn into_tool_error(self) -> ToolError {
        ToolError::new(ErrorKind::Validation, self.to_string())
    }
}

impl IntoToolError for anyhow::Error {
    fn into_tool_error(self) -> ToolError {
        ToolError::new(ErrorKind::Fatal, self.to_string())
    }
}
