//! Upload manifest: the handshake document describing what's in an
//! upload, so the receiving end can verify completeness and dedup by
//! checksum without re-reading file contents itself.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Manifest uploader identity. Fixed: this crate is always the uploader.
pub const UPLOADER: &str = "session-buddy";
pub const MANIFEST_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub compression: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub uploader: String,
    pub version: String,
}

impl Default for ManifestMetadata {
    fn default() -> Self {
        Self {
            uploader: UPLOADER.to_string(),
            version: MANIFEST_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadManifest {
    pub upload_id: String,
    pub system_id: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<ManifestFile>,
    pub metadata: ManifestMetadata,
}

/// Build an upload id of the form `YYYYMMDD_HHMMSS_{system_id}` in UTC,
/// so upload ids sort lexicographically in upload order.
pub fn make_upload_id(system_id: &str, now: DateTime<Utc>) -> String {
    format!("{}_{system_id}", now.format("%Y%m%d_%H%M%S"))
}

/// SHA-256 checksum of a file's contents, hex-encoded.
pub fn checksum_file(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Build a manifest entry for `path`'s contents, `compression` being
/// e.g. `"gzip"` or `"none"`.
pub fn manifest_file(path: &Path, bytes: &[u8], compression: &str) -> ManifestFile {
    ManifestFile {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path: path.to_string_lossy().to_string(),
        size_bytes: bytes.len() as u64,
        compression: compression.to_string(),
        checksum: checksum_file(bytes),
    }
}

/// Remote key layout: `systems/{system_id}/uploads/{upload_id}/{name}`.
pub fn remote_key(system_id: &str, upload_id: &str, file_name: &str) -> String {
    format!("systems/{system_id}/uploads/{upload_id}/{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn upload_id_has_expected_shape() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 13, 45, 2).unwrap();
        assert_eq!(make_upload_id("sys-a", now), "20260105_134502_sys-a");
    }

    #[test]
    fn checksum_is_deterministic() {
        let a = checksum_file(b"hello world");
        let b = checksum_file(b"hello world");
        assert_eq!(a, b);
        assert_ne!(a, checksum_file(b"hello there"));
    }

    #[test]
    fn remote_key_matches_layout() {
        let key = remote_key("sys-a", "20260105_134502_sys-a", "manifest.json");
        assert_eq!(key, "systems/sys-a/uploads/20260105_134502_sys-a/manifest.json");
    }
}
