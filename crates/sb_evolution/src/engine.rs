//! `CategoryEvolutionEngine`: owns the learned subcategory state per
//! top-level category and drives both assignment (read path) and
//! periodic re-clustering (write path).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use sb_fingerprint::MinHashSignature;

use crate::assign::{assign_subcategory as assign_subcategory_fn, SubcategoryCentroid};
use crate::cluster::{cluster_memories, silhouette_score};
use crate::config::EvolutionConfig;
use crate::decay::apply_temporal_decay;
use crate::error::Result;
use crate::memory::{keyword_set, EvolvableMemory};
use crate::types::{AssignmentResult, Category, CategorySnapshotState, EvolutionSnapshot, Subcategory};

/// The engine's working state for one top-level category: the
/// subcategories themselves plus the per-subcategory centroid and
/// fingerprint pool used for scoring, rebuilt on every `evolve_category`.
#[derive(Default, Clone)]
struct CategoryState {
    subcategories: Vec<Subcategory>,
    centroids: Vec<Option<Vec<f32>>>,
    fingerprints: Vec<Vec<MinHashSignature>>,
    last_silhouette: f64,
}

pub struct CategoryEvolutionEngine {
    state: Mutex<HashMap<Category, CategoryState>>,
}

impl Default for CategoryEvolutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryEvolutionEngine {
    pub fn new() -> Self {
        Self { state: Mutex::new(HashMap::new()) }
    }

    /// Current subcategories known for `category`, for callers (e.g. a
    /// tool handler) that want to list them without triggering a re-cluster.
    pub fn subcategories(&self, category: Category) -> Vec<Subcategory> {
        self.state
            .lock()
            .expect("evolution engine state lock poisoned")
            .get(&category)
            .map(|s| s.subcategories.clone())
            .unwrap_or_default()
    }

    /// Assign `memory` to a subcategory of the resolved category, using
    /// whatever subcategory state the engine currently holds (empty
    /// until the first `evolve_category` call for that category, which
    /// is fine: an empty candidate set yields the `default` method).
    pub fn assign_subcategory(
        &self,
        memory: &EvolvableMemory,
        category: Option<Category>,
        config: &EvolutionConfig,
        use_fingerprint_prefilter: bool,
    ) -> AssignmentResult {
        let resolved = category.unwrap_or_else(|| crate::assign::detect_category(&memory.content));
        let guard = self.state.lock().expect("evolution engine state lock poisoned");
        let candidates: Vec<SubcategoryCentroid> = guard
            .get(&resolved)
            .map(|state| {
                state
                    .subcategories
                    .iter()
                    .zip(state.centroids.iter())
                    .zip(state.fingerprints.iter())
                    .map(|((sub, centroid), fps)| SubcategoryCentroid {
                        subcategory: sub.clone(),
                        centroid: centroid.clone(),
                        member_fingerprints: fps.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        drop(guard);

        assign_subcategory_fn(memory, Some(resolved), &candidates, config, use_fingerprint_prefilter)
    }

    /// Re-cluster `memories` (all belonging to `category`) into
    /// subcategories and apply temporal decay.
    pub fn evolve_category(
        &self,
        category: Category,
        memories: &[EvolvableMemory],
        config: &EvolutionConfig,
    ) -> Result<EvolutionSnapshot> {
        config.validate()?;
        let started = Instant::now();

        let before_state = {
            let guard = self.state.lock().expect("evolution engine state lock poisoned");
            let existing = guard.get(&category).cloned();
            let silhouette = existing.as_ref().map(|s| s.last_silhouette).unwrap_or(0.0);
            CategorySnapshotState {
                subcategory_count: existing.map(|s| s.subcategories.len()).unwrap_or(0),
                silhouette,
                total_memories: memories.len(),
            }
        };

        if memories.len() < config.memory_count_threshold {
            info!(
                category = category.as_str(),
                count = memories.len(),
                threshold = config.memory_count_threshold,
                "not enough memories to evolve category"
            );
            let after_state = before_state.clone();
            return Ok(EvolutionSnapshot {
                id: uuid::Uuid::new_v4().to_string(),
                category,
                before_state,
                after_state,
                decay_results: vec![],
                duration_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });
        }

        let (sorted, clusters) = cluster_memories(memories, config.min_cluster_size, config.max_clusters);
        let silhouette = silhouette_score(&sorted, &clusters);
        if silhouette < config.min_silhouette_score {
            warn!(
                category = category.as_str(),
                silhouette, min = config.min_silhouette_score, "clustering below quality floor"
            );
        }

        let now = Utc::now();
        let mut new_subcategories = Vec::with_capacity(clusters.len());
        let mut centroids = Vec::with_capacity(clusters.len());
        let mut fingerprints = Vec::with_capacity(clusters.len());

        for cluster in &clusters {
            let members: Vec<&EvolvableMemory> = cluster.members.iter().map(|&i| &sorted[i]).collect();
            let name = derive_subcategory_name(&members);
            let keywords = derive_keywords(&members);

            let mut sub = Subcategory::new(category, name, keywords);
            sub.memory_count = members.len();
            sub.created_at = now;
            sub.updated_at = now;
            sub.last_used_at = members
                .iter()
                .filter_map(|m| m.last_used_at)
                .max();
            sub.access_count = members.iter().map(|m| m.access_count).sum();

            centroids.push(centroid_of(&members));
            fingerprints.push(members.iter().filter_map(|m| m.fingerprint.clone()).collect());
            new_subcategories.push(sub);
        }

        let mut guard = self.state.lock().expect("evolution engine state lock poisoned");
        let decay_results = {
            let mut subs = new_subcategories.clone();
            let results = apply_temporal_decay(&mut subs, config);
            // Keep centroids/fingerprints in lockstep with whatever
            // survived decay.
            let surviving_ids: std::collections::HashSet<&str> =
                subs.iter().map(|s| s.id.as_str()).collect();
            let mut kept_centroids = Vec::with_capacity(subs.len());
            let mut kept_fps = Vec::with_capacity(subs.len());
            for (i, sub) in new_subcategories.iter().enumerate() {
                if surviving_ids.contains(sub.id.as_str()) {
                    kept_centroids.push(centroids[i].clone());
                    kept_fps.push(fingerprints[i].clone());
                }
            }
            new_subcategories = subs;
            centroids = kept_centroids;
            fingerprints = kept_fps;
            results
        };

        let after_state = CategorySnapshotState {
            subcategory_count: new_subcategories.len(),
            silhouette,
            total_memories: memories.len(),
        };

        guard.insert(
            category,
            CategoryState { subcategories: new_subcategories, centroids, fingerprints, last_silhouette: silhouette },
        );
        drop(guard);

        let snapshot = EvolutionSnapshot {
            id: uuid::Uuid::new_v4().to_string(),
            category,
            before_state,
            after_state,
            decay_results,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        };
        info!(
            category = category.as_str(),
            subcategories = snapshot.after_state.subcategory_count,
            silhouette,
            "evolved category"
        );
        Ok(snapshot)
    }
}

fn centroid_of(members: &[&EvolvableMemory]) -> Option<Vec<f32>> {
    let embeddings: Vec<&Vec<f32>> = members.iter().filter_map(|m| m.embedding.as_ref()).collect();
    if embeddings.is_empty() {
        return None;
    }
    let dim = embeddings[0].len();
    let mut sum = vec![0f32; dim];
    for e in &embeddings {
        for (i, v) in e.iter().enumerate() {
            if i < dim {
                sum[i] += v;
            }
        }
    }
    let n = embeddings.len() as f32;
    Some(sum.into_iter().map(|v| v / n).collect())
}

fn derive_keywords(members: &[&EvolvableMemory]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for m in members {
        for word in keyword_set(&m.content) {
            if word.len() > 3 {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }
    let mut words: Vec<(String, usize)> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.into_iter().take(5).map(|(w, _)| w).collect()
}

fn derive_subcategory_name(members: &[&EvolvableMemory]) -> String {
    derive_keywords(members)
        .first()
        .cloned()
        .unwrap_or_else(|| "general".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem(id: &str, content: &str, embedding: Vec<f32>) -> EvolvableMemory {
        EvolvableMemory::new(id, content).with_embedding(embedding)
    }

    #[test]
    fn evolve_with_too_few_memories_is_a_no_op() {
        let engine = CategoryEvolutionEngine::new();
        let config = EvolutionConfig::default();
        let memories = vec![mem("a", "rust async workers", vec![1.0, 0.0])];
        let snapshot = engine.evolve_category(Category::Skills, &memories, &config).unwrap();
        assert_eq!(snapshot.after_state.subcategory_count, 0);
        assert_eq!(snapshot.before_state.total_memories, snapshot.after_state.total_memories);
    }

    #[test]
    fn evolve_produces_subcategories_and_assign_finds_them() {
        let engine = CategoryEvolutionEngine::new();
        let mut config = EvolutionConfig::default();
        config.memory_count_threshold = 4;
        config.min_cluster_size = 2;
        config.max_clusters = 2;
        config.similarity_threshold = 0.1;

        let memories: Vec<EvolvableMemory> = vec![
            mem("a1", "rust async worker pool design", vec![1.0, 0.0, 0.0]),
            mem("a2", "rust async worker scheduling", vec![0.9, 0.1, 0.0]),
            mem("b1", "favorite pasta recipe tonight", vec![0.0, 0.0, 1.0]),
            mem("b2", "favorite pasta sauce recipe", vec![0.0, 0.1, 0.9]),
        ];

        let snapshot = engine.evolve_category(Category::Skills, &memories, &config).unwrap();
        assert!(snapshot.after_state.subcategory_count >= 1);

        let probe = mem("probe", "rust async worker design notes", vec![0.95, 0.05, 0.0]);
        let assignment = engine.assign_subcategory(&probe, Some(Category::Skills), &config, true);
        assert!(assignment.confidence > 0.0);
    }
}
