//! HTTP fallback sync method: calls a remote tool endpoint directly
//! instead of object storage, for environments with no cloud access but
//! a reachable peer.

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;

use crate::error::{Result, SyncError};
use crate::manifest::{make_upload_id, manifest_file, ManifestMetadata, UploadManifest};
use crate::protocol::{SyncMethod, SyncOutcome};

/// Default endpoint the original scheduler falls back to when no other
/// endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8682/mcp";

/// Tool name invoked on the remote endpoint.
pub const TOOL_NAME: &str = "batch_store_memories";

pub struct HttpSyncMethod {
    client: Client,
    endpoint: String,
}

impl HttpSyncMethod {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpSyncMethod {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncMethod for HttpSyncMethod {
    async fn sync(&self, system_id: &str, files: &[&Path]) -> Result<SyncOutcome> {
        let now = Utc::now();
        let upload_id = make_upload_id(system_id, now);

        let mut manifest_files = Vec::with_capacity(files.len());
        let mut payload_files = Vec::with_capacity(files.len());
        for path in files {
            let raw = tokio::fs::read(path)
                .await
                .map_err(|e| SyncError::Http(format!("reading {}: {e}", path.display())))?;
            let entry = manifest_file(path, &raw, "none");
            payload_files.push(json!({
                "name": entry.name,
                "content_base64": BASE64.encode(&raw),
            }));
            manifest_files.push(entry);
        }

        let manifest = UploadManifest {
            upload_id,
            system_id: system_id.to_string(),
            timestamp: now,
            files: manifest_files,
            metadata: ManifestMetadata::default(),
        };

        let body = json!({
            "tool": TOOL_NAME,
            "arguments": {
                "system_id": system_id,
                "manifest": manifest,
                "files": payload_files,
            },
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Http(format!("POST {}: {e}", self.endpoint)))?;

        if !resp.status().is_success() {
            return Err(SyncError::Http(format!(
                "{} returned {}",
                self.endpoint,
                resp.status()
            )));
        }

        Ok(SyncOutcome {
            method: self.get_method_name().to_string(),
            manifest,
        })
    }

    async fn is_available(&self) -> bool {
        self.client
            .head(&self.endpoint)
            .send()
            .await
            .map(|r| !r.status().is_server_error())
            .unwrap_or(false)
    }

    fn get_method_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_matches_spec() {
        assert_eq!(HttpSyncMethod::new().endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn base64_round_trips_known_vector() {
        assert_eq!(BASE64.encode(b"hello"), "aGVsbG8=");
        assert_eq!(BASE64.encode(b"hi"), "aGk=");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let method = HttpSyncMethod::with_endpoint("http://127.0.0.1:1/mcp");
        assert!(!method.is_available().await);
    }
}
