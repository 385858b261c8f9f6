//! Temporal decay: subcategories that haven't been touched in a while
//! and aren't accessed often are archived or deleted.

use chrono::Utc;

use crate::config::{ArchiveOption, EvolutionConfig};
use crate::types::{DecayResult, Subcategory};

/// Average bytes a subcategory's bookkeeping (id, name, keyword list,
/// member index) occupies; used only to report a plausible
/// `bytes_freed` figure, not persisted anywhere.
const ESTIMATED_BYTES_PER_SUBCATEGORY: u64 = 256;

/// Evaluate every subcategory for decay and apply `config.archive_option`
/// to the ones that qualify. Returns the per-subcategory outcome; the
/// caller is responsible for actually removing archived/deleted rows
/// from its own storage.
pub fn apply_temporal_decay(
    subcategories: &mut Vec<Subcategory>,
    config: &EvolutionConfig,
) -> Vec<DecayResult> {
    if !config.temporal_decay_enabled {
        return vec![];
    }

    let now = Utc::now();
    let mut results = Vec::new();
    let mut keep = Vec::with_capacity(subcategories.len());

    for sub in subcategories.drain(..) {
        let stale = match sub.last_used_at {
            Some(last) => (now - last).num_days() > config.temporal_decay_days as i64,
            None => (now - sub.created_at).num_days() > config.temporal_decay_days as i64,
        };
        let rarely_accessed = sub.access_count < config.decay_access_threshold;

        if stale && rarely_accessed {
            let archived = matches!(config.archive_option, ArchiveOption::Archive);
            let bytes_freed =
                ESTIMATED_BYTES_PER_SUBCATEGORY + sub.keywords.iter().map(|k| k.len() as u64).sum::<u64>();
            results.push(DecayResult {
                subcategory_id: sub.id.clone(),
                decayed: true,
                archived,
                bytes_freed,
            });
            if archived {
                // Archived subcategories are retained (caller may move
                // them to cold storage) but are no longer live.
                keep.push(sub);
            }
            // Deleted subcategories are simply not pushed back.
        } else {
            keep.push(sub);
        }
    }

    *subcategories = keep;
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stale_subcategory(access_count: u32) -> Subcategory {
        let mut sub = Subcategory::new(crate::types::Category::Facts, "old", vec!["x".into()]);
        sub.last_used_at = Some(Utc::now() - Duration::days(200));
        sub.access_count = access_count;
        sub
    }

    #[test]
    fn decays_stale_rarely_used_subcategory() {
        let mut subs = vec![stale_subcategory(0)];
        let config = EvolutionConfig::default();
        let results = apply_temporal_decay(&mut subs, &config);
        assert_eq!(results.len(), 1);
        assert!(results[0].decayed);
    }

    #[test]
    fn does_not_decay_frequently_accessed_subcategory() {
        let mut subs = vec![stale_subcategory(100)];
        let config = EvolutionConfig::default();
        let results = apply_temporal_decay(&mut subs, &config);
        assert!(results.is_empty());
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn delete_option_removes_subcategory_entirely() {
        let mut subs = vec![stale_subcategory(0)];
        let mut config = EvolutionConfig::default();
        config.archive_option = ArchiveOption::Delete;
        let results = apply_temporal_decay(&mut subs, &config);
        assert_eq!(results.len(), 1);
        assert!(!results[0].archived);
        assert!(subs.is_empty());
    }

    #[test]
    fn disabled_decay_is_a_no_op() {
        let mut subs = vec![stale_subcategory(0)];
        let mut config = EvolutionConfig::default();
        config.temporal_decay_enabled = false;
        let results = apply_temporal_decay(&mut subs, &config);
        assert!(results.is_empty());
        assert_eq!(subs.len(), 1);
    }
}
