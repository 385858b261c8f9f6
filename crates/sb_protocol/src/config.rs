//! Cross-cutting configuration recognized by the handler layer. Each
//! collaborator crate (`sb_store`, `sb_sync`, `sb_evolution`) owns its
//! own narrower config type; this is the surface a CLI flag or
//! environment variable actually binds to before the handler builds
//! those narrower types from it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which sync method the hybrid orchestrator is pinned to, or `Auto` to
/// walk the priority chain (cloud, then HTTP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceMethod {
    #[default]
    Auto,
    Cloud,
    Http,
}

impl ForceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForceMethod::Auto => "auto",
            ForceMethod::Cloud => "cloud",
            ForceMethod::Http => "http",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBuddyConfig {
    // Memory store
    pub collection_name: String,
    pub database_path: PathBuf,
    pub embedding_dim: usize,
    pub enable_embeddings: bool,
    pub enable_vss: bool,

    // Hybrid sync (akosha_*)
    pub akosha_cloud_bucket: Option<String>,
    pub akosha_cloud_endpoint: Option<String>,
    pub akosha_cloud_region: Option<String>,
    pub akosha_system_id: Option<String>,
    pub akosha_force_method: ForceMethod,
    pub akosha_enable_fallback: bool,
    pub akosha_upload_on_session_end: bool,
    pub akosha_upload_timeout_seconds: u64,
    pub akosha_max_retries: u32,
    pub akosha_retry_backoff_seconds: u64,
    pub akosha_enable_compression: bool,
    pub akosha_enable_deduplication: bool,
    pub akosha_chunk_size_mb: u64,
}

impl Default for SessionBuddyConfig {
    fn default() -> Self {
        Self {
            collection_name: "default".to_string(),
            database_path: PathBuf::from("session_buddy.db"),
            embedding_dim: 384,
            enable_embeddings: true,
            enable_vss: true,

            akosha_cloud_bucket: None,
            akosha_cloud_endpoint: None,
            akosha_cloud_region: None,
            akosha_system_id: None,
            akosha_force_method: ForceMethod::Auto,
            akosha_enable_fallback: true,
            akosha_upload_on_session_end: false,
            akosha_upload_timeout_seconds: 30,
            akosha_max_retries: 3,
            akosha_retry_backoff_seconds: 1,
            akosha_enable_compression: true,
            akosha_enable_deduplication: true,
            akosha_chunk_size_mb: 8,
        }
    }
}

impl SessionBuddyConfig {
    /// Whether a cloud target is configured at all -- the bucket (here,
    /// modeled as the endpoint base URL) is non-empty.
    pub fn cloud_configured(&self) -> bool {
        self.akosha_cloud_bucket.as_deref().is_some_and(|b| !b.is_empty())
    }

    pub fn should_use_cloud(&self) -> bool {
        match self.akosha_force_method {
            ForceMethod::Cloud => true,
            ForceMethod::Auto => self.cloud_configured(),
            ForceMethod::Http => false,
        }
    }

    pub fn should_use_http(&self) -> bool {
        match self.akosha_force_method {
            ForceMethod::Http => true,
            ForceMethod::Auto => !self.cloud_configured() || self.akosha_enable_fallback,
            ForceMethod::Cloud => false,
        }
    }

    /// Resolve the system id: explicit config, else `HOSTNAME` /
    /// `COMPUTERNAME` from the environment.
    pub fn resolved_system_id(&self) -> String {
        if let Some(id) = &self.akosha_system_id {
            if !id.is_empty() {
                return id.clone();
            }
        }
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "unknown-system".to_string())
    }
}
