//! Hybrid sync: a priority-ordered chain of [`SyncMethod`]s (cloud
//! object storage, then an HTTP fallback), each retried with exponential
//! backoff, with checksum-based manifests so the receiving end can
//! verify and dedup an upload without re-reading its contents.

pub mod cloud;
pub mod error;
pub mod http;
pub mod hybrid;
pub mod manifest;
pub mod protocol;

pub use cloud::CloudSyncMethod;
pub use error::{MethodFailure, Result, SyncError};
pub use http::{HttpSyncMethod, DEFAULT_ENDPOINT, TOOL_NAME};
pub use hybrid::{HybridSync, RetryPolicy};
pub use manifest::{checksum_file, make_upload_id, ManifestFile, ManifestMetadata, UploadManifest};
pub use protocol::{SyncMethod, SyncOutcome};
