//! Cloud object-storage sync method: gzip each file, checksum it, and
//! upload it plus a manifest.json handshake under a per-upload prefix.
//!
//! Stands in for an S3/R2/MinIO adapter: uploads go over plain HTTPS
//! PUT/HEAD against a bucket's REST endpoint, which is how every one of
//! those backends is reachable anyway.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Client;
use tokio::io::AsyncReadExt;

use crate::error::{Result, SyncError};
use crate::manifest::{make_upload_id, manifest_file, remote_key, ManifestMetadata, UploadManifest};
use crate::protocol::{SyncMethod, SyncOutcome};

/// Header the uploader stamps on every object and checks back on dedup
/// HEAD probes. Stands in for the object store's own ETag/checksum
/// metadata field.
const CHECKSUM_HEADER: &str = "x-sb-checksum";

/// Chunk size used when streaming a file through the gzip encoder, so a
/// large conversation export doesn't need to live fully in memory twice
/// (raw + compressed) before the network write starts.
const READ_CHUNK_BYTES: usize = 1024 * 1024;

pub struct CloudSyncMethod {
    client: Client,
    bucket: String,
    base_url: String,
    enable_compression: bool,
    enable_deduplication: bool,
}

impl CloudSyncMethod {
    /// Construct a cloud sync method, validating the bucket name and
    /// endpoint: an invalid bucket name or a non-HTTPS endpoint is
    /// rejected here, at construction, rather than surfacing as an
    /// upload failure later.
    pub fn try_new(
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
        enable_compression: bool,
        enable_deduplication: bool,
    ) -> Result<Self> {
        let bucket = bucket.into();
        let base_url = endpoint.into();
        validate_bucket_name(&bucket)?;
        validate_endpoint(&base_url)?;
        Ok(Self {
            client: Client::new(),
            bucket,
            base_url,
            enable_compression,
            enable_deduplication,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn read_and_compress(&self, path: &Path) -> Result<(Vec<u8>, String)> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| SyncError::CloudUpload(format!("opening {}: {e}", path.display())))?;

        if !self.enable_compression {
            let mut raw = Vec::new();
            file.read_to_end(&mut raw)
                .await
                .map_err(|e| SyncError::CloudUpload(format!("reading {}: {e}", path.display())))?;
            return Ok((raw, "none".to_string()));
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| SyncError::CloudUpload(format!("reading {}: {e}", path.display())))?;
            if n == 0 {
                break;
            }
            encoder
                .write_all(&buf[..n])
                .map_err(|e| SyncError::CloudUpload(format!("compressing {}: {e}", path.display())))?;
        }
        let compressed = encoder
            .finish()
            .map_err(|e| SyncError::CloudUpload(format!("finalizing gzip for {}: {e}", path.display())))?;
        Ok((compressed, "gzip".to_string()))
    }

    /// HEAD the target key and report the checksum it claims to hold,
    /// if any. Used for dedup: a matching checksum means the bytes are
    /// already present and the PUT can be skipped.
    async fn existing_checksum(&self, key: &str) -> Option<String> {
        let resp = self.client.head(self.object_url(key)).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.headers()
            .get(CHECKSUM_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

fn validate_bucket_name(name: &str) -> Result<()> {
    let valid = (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if !valid {
        return Err(SyncError::Validation(format!(
            "invalid cloud bucket name: {name:?} (must be 3-63 chars of lowercase letters, digits, '-', '.')"
        )));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    if !endpoint.starts_with("https://") {
        return Err(SyncError::Validation(format!(
            "cloud endpoint must use https: {endpoint:?}"
        )));
    }
    Ok(())
}

#[async_trait]
impl SyncMethod for CloudSyncMethod {
    async fn sync(&self, system_id: &str, files: &[&Path]) -> Result<SyncOutcome> {
        let now = Utc::now();
        let upload_id = make_upload_id(system_id, now);

        let mut manifest_files = Vec::with_capacity(files.len());
        for path in files {
            let (body, compression) = self.read_and_compress(path).await?;
            let entry = manifest_file(path, &body, &compression);
            let file_name = if compression == "gzip" {
                format!("{}.gz", entry.name)
            } else {
                entry.name.clone()
            };
            let key = remote_key(system_id, &upload_id, &file_name);

            if self.enable_deduplication {
                if let Some(existing) = self.existing_checksum(&key).await {
                    if existing == entry.checksum {
                        manifest_files.push(entry);
                        continue;
                    }
                }
            }

            self.put_object(&key, body, &entry.checksum).await?;
            manifest_files.push(entry);
        }

        let manifest = UploadManifest {
            upload_id: upload_id.clone(),
            system_id: system_id.to_string(),
            timestamp: now,
            files: manifest_files,
            metadata: ManifestMetadata::default(),
        };

        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| SyncError::CloudUpload(format!("serializing manifest: {e}")))?;
        let manifest_key = remote_key(system_id, &upload_id, "manifest.json");
        let manifest_checksum = crate::manifest::checksum_file(&manifest_bytes);
        self.put_object(&manifest_key, manifest_bytes, &manifest_checksum).await?;

        Ok(SyncOutcome {
            method: self.get_method_name().to_string(),
            manifest,
        })
    }

    async fn is_available(&self) -> bool {
        self.client
            .head(&self.base_url)
            .send()
            .await
            .map(|r| r.status().is_success() || r.status().as_u16() == 405)
            .unwrap_or(false)
    }

    fn get_method_name(&self) -> &str {
        "cloud"
    }
}

impl CloudSyncMethod {
    async fn put_object(&self, key: &str, body: Vec<u8>, checksum: &str) -> Result<()> {
        let resp = self
            .client
            .put(self.object_url(key))
            .header(CHECKSUM_HEADER, checksum)
            .body(body)
            .send()
            .await
            .map_err(|e| SyncError::CloudUpload(format!("PUT {key}: {e}")))?;

        if !resp.status().is_success() {
            return Err(SyncError::CloudUpload(format!(
                "PUT {key} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_joins_base_and_key() {
        let method = CloudSyncMethod::try_new("my-bucket", "https://storage.example.com/bucket/", true, true)
            .unwrap();
        assert_eq!(
            method.object_url("systems/a/uploads/u1/manifest.json"),
            "https://storage.example.com/bucket/systems/a/uploads/u1/manifest.json"
        );
    }

    #[test]
    fn rejects_invalid_bucket_name() {
        let err = CloudSyncMethod::try_new("Not_Valid!", "https://storage.example.com", true, true)
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn rejects_non_https_endpoint() {
        let err = CloudSyncMethod::try_new("my-bucket", "http://storage.example.com", true, true)
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn rejects_empty_bucket_name() {
        assert!(CloudSyncMethod::try_new("", "https://storage.example.com", true, true).is_err());
    }

    #[tokio::test]
    async fn unreachable_base_url_is_unavailable() {
        let method = CloudSyncMethod::try_new("my-bucket", "https://127.0.0.1:1", true, true).unwrap();
        assert!(!method.is_available().await);
    }
}
