//! `EvolutionConfig`: tuning knobs for re-clustering and temporal decay.
//!
//! Mirrors the `StoreConfig`/`SyncConfig` pattern used by `sb_store` and
//! `sb_sync`: a plain `Default`-able struct validated once at construction
//! rather than re-checked on every call.

use crate::error::{EvolutionError, Result};

/// What happens to a subcategory whose last use is older than
/// `temporal_decay_days` and whose member memories are accessed rarely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveOption {
    /// Keep the row but mark it archived; no memories are deleted.
    #[default]
    Archive,
    /// Delete the subcategory outright.
    Delete,
}

#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub temporal_decay_enabled: bool,
    pub temporal_decay_days: u32,
    pub decay_access_threshold: u32,
    pub archive_option: ArchiveOption,
    pub min_silhouette_score: f64,
    pub min_cluster_size: usize,
    pub max_clusters: usize,
    pub similarity_threshold: f64,
    pub fingerprint_threshold: f64,
    /// Minimum number of memories a category must have before
    /// `evolve_category` will re-cluster it at all.
    pub memory_count_threshold: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            temporal_decay_enabled: true,
            temporal_decay_days: 90,
            decay_access_threshold: 2,
            archive_option: ArchiveOption::Archive,
            min_silhouette_score: 0.2,
            min_cluster_size: 2,
            max_clusters: 12,
            similarity_threshold: 0.55,
            fingerprint_threshold: 0.5,
            memory_count_threshold: 10,
        }
    }
}

impl EvolutionConfig {
    /// Validate cross-field consistency and ranges: cluster-size bounds
    /// must be non-zero and ordered, and every probability field must
    /// land in `[0, 1]`; everything else is `Default`-safe by
    /// construction.
    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size == 0 {
            return Err(EvolutionError::InvalidConfig(
                "min_cluster_size must be at least 1".into(),
            ));
        }
        if self.min_cluster_size > self.max_clusters {
            return Err(EvolutionError::InvalidConfig(format!(
                "min_cluster_size ({}) must be <= max_clusters ({})",
                self.min_cluster_size, self.max_clusters
            )));
        }
        for (name, value) in [
            ("min_silhouette_score", self.min_silhouette_score),
            ("similarity_threshold", self.similarity_threshold),
            ("fingerprint_threshold", self.fingerprint_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(EvolutionError::InvalidConfig(format!(
                    "{name} must be in [-1, 1], got {value}"
                )));
            }
        }
        if self.temporal_decay_days == 0 {
            return Err(EvolutionError::InvalidConfig(
                "temporal_decay_days must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EvolutionConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_min_cluster_size_above_max_clusters() {
        let mut cfg = EvolutionConfig::default();
        cfg.min_cluster_size = 20;
        cfg.max_clusters = 5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_similarity_threshold() {
        let mut cfg = EvolutionConfig::default();
        cfg.similarity_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }
}
