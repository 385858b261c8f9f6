//! The typed interface every sync method implements. The original
//! scheduler duck-typed this as a `Protocol` with `sync`/`is_available`/
//! `get_method_name`; a trait makes the same contract explicit.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::manifest::UploadManifest;

/// Outcome of a single successful sync.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncOutcome {
    pub method: String,
    pub manifest: UploadManifest,
}

/// A way of getting local files to a remote destination.
#[async_trait]
pub trait SyncMethod: Send + Sync {
    /// Upload `files` (already-resolved local paths) for `system_id`.
    async fn sync(&self, system_id: &str, files: &[&Path]) -> Result<SyncOutcome>;

    /// Whether this method is currently reachable. Checked before
    /// `sync` is attempted so the orchestrator can skip a known-down
    /// method without paying its retry budget.
    async fn is_available(&self) -> bool;

    fn get_method_name(&self) -> &str;
}
