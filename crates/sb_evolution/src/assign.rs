//! `assign_subcategory`: map a memory to `(category, subcategory)` with a
//! confidence score.

use sb_store::cosine_similarity;

use crate::config::EvolutionConfig;
use crate::memory::{keyword_set, EvolvableMemory};
use crate::types::{AssignmentMethod, AssignmentResult, Category, Subcategory};

/// Centroid of a subcategory's member embeddings, kept alongside the
/// subcategory itself for scoring. The engine recomputes this whenever a
/// subcategory's membership changes; the assigner only reads it.
#[derive(Debug, Clone)]
pub struct SubcategoryCentroid {
    pub subcategory: Subcategory,
    pub centroid: Option<Vec<f32>>,
    pub member_fingerprints: Vec<sb_fingerprint::MinHashSignature>,
}

/// Detect a top-level category from content when the caller doesn't
/// supply one. The only real contract is "assigns a non-null category";
/// this keyword heuristic is a deliberately simple way to satisfy it.
pub fn detect_category(content: &str) -> Category {
    let lower = content.to_lowercase();
    const RULE_WORDS: &[&str] = &["always", "never", "must", "should not", "rule:"];
    const SKILL_WORDS: &[&str] = &["how to", "steps to", "procedure", "workflow", "technique"];
    const PREFERENCE_WORDS: &[&str] = &["prefer", "like", "dislike", "favorite", "rather"];
    const CONTEXT_WORDS: &[&str] = &["currently", "working on", "session", "today", "right now"];

    if RULE_WORDS.iter().any(|w| lower.contains(w)) {
        Category::Rules
    } else if SKILL_WORDS.iter().any(|w| lower.contains(w)) {
        Category::Skills
    } else if PREFERENCE_WORDS.iter().any(|w| lower.contains(w)) {
        Category::Preferences
    } else if CONTEXT_WORDS.iter().any(|w| lower.contains(w)) {
        Category::Context
    } else {
        Category::Facts
    }
}

/// Assign `memory` to the best-matching subcategory among `candidates`
/// (all belonging to the resolved `category`).
///
/// Proceeds step by step:
/// 1. resolve the category if absent,
/// 2. fingerprint-prefilter the candidate set (fast path),
/// 3. score survivors by embedding cosine similarity (or keyword overlap),
/// 4. fall back to a default subcategory if nothing clears the threshold.
pub fn assign_subcategory(
    memory: &EvolvableMemory,
    category: Option<Category>,
    candidates: &[SubcategoryCentroid],
    config: &EvolutionConfig,
    use_fingerprint_prefilter: bool,
) -> AssignmentResult {
    let category = category.unwrap_or_else(|| detect_category(&memory.content));

    let relevant: Vec<&SubcategoryCentroid> = candidates
        .iter()
        .filter(|c| c.subcategory.parent_category == category)
        .collect();

    let prefiltered: Vec<&SubcategoryCentroid> =
        if use_fingerprint_prefilter && memory.fingerprint.is_some() {
            let mf = memory.fingerprint.as_ref().unwrap();
            let narrowed: Vec<&SubcategoryCentroid> = relevant
                .iter()
                .copied()
                .filter(|c| {
                    c.member_fingerprints.is_empty()
                        || c.member_fingerprints
                            .iter()
                            .any(|fp| fp.estimate_jaccard_similarity(mf) >= config.fingerprint_threshold)
                })
                .collect();
            // A prefilter that rules out every candidate degrades rather
            // than returning "no match"; still score the full set so a
            // merely-sparse fingerprint index doesn't force a default.
            if narrowed.is_empty() { relevant } else { narrowed }
        } else {
            relevant
        };

    let mut best: Option<(&SubcategoryCentroid, f64, AssignmentMethod)> = None;
    for candidate in &prefiltered {
        let (score, method) = match (&memory.embedding, &candidate.centroid) {
            (Some(m), Some(c)) => (cosine_similarity(m, c), AssignmentMethod::EmbeddingCosine),
            _ => {
                let mem_words = keyword_set(&memory.content);
                let kw_words: std::collections::HashSet<String> =
                    candidate.subcategory.keywords.iter().cloned().collect();
                let overlap = if mem_words.is_empty() || kw_words.is_empty() {
                    0.0
                } else {
                    mem_words.intersection(&kw_words).count() as f64 / mem_words.len() as f64
                };
                (overlap, AssignmentMethod::KeywordMatch)
            }
        };
        if best.as_ref().map(|(_, best_score, _)| score > *best_score).unwrap_or(true) {
            best = Some((candidate, score, method));
        }
    }

    match best {
        Some((candidate, score, method)) if score >= config.similarity_threshold => {
            AssignmentResult {
                category,
                subcategory: candidate.subcategory.name.clone(),
                confidence: score,
                method: if use_fingerprint_prefilter && memory.fingerprint.is_some() {
                    AssignmentMethod::FingerprintPrefilter
                } else {
                    method
                },
            }
        }
        Some((_, score, _)) => AssignmentResult {
            category,
            subcategory: "uncategorized".to_string(),
            confidence: score,
            method: AssignmentMethod::Default,
        },
        None => AssignmentResult {
            category,
            subcategory: "uncategorized".to_string(),
            confidence: 0.0,
            method: AssignmentMethod::Default,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subcat(name: &str, keywords: &[&str]) -> SubcategoryCentroid {
        SubcategoryCentroid {
            subcategory: Subcategory::new(
                Category::Facts,
                name,
                keywords.iter().map(|s| s.to_string()).collect(),
            ),
            centroid: None,
            member_fingerprints: vec![],
        }
    }

    #[test]
    fn detects_rule_content() {
        assert_eq!(detect_category("you must always run tests before committing"), Category::Rules);
    }

    #[test]
    fn detects_preference_content() {
        assert_eq!(detect_category("I prefer tabs over spaces"), Category::Preferences);
    }

    #[test]
    fn falls_back_to_default_when_nothing_clears_threshold() {
        let mem = EvolvableMemory::new("m1", "completely unrelated content");
        let candidates = vec![subcat("rust", &["rust", "cargo", "async"])];
        let config = EvolutionConfig::default();
        let result = assign_subcategory(&mem, Some(Category::Facts), &candidates, &config, false);
        assert_eq!(result.method, AssignmentMethod::Default);
        assert_eq!(result.subcategory, "uncategorized");
    }

    #[test]
    fn keyword_overlap_selects_matching_subcategory() {
        let mem = EvolvableMemory::new("m1", "rust cargo async workflow");
        let candidates = vec![
            subcat("rust", &["rust", "cargo", "async"]),
            subcat("cooking", &["recipe", "oven", "bake"]),
        ];
        let mut config = EvolutionConfig::default();
        config.similarity_threshold = 0.3;
        let result = assign_subcategory(&mem, Some(Category::Facts), &candidates, &config, false);
        assert_eq!(result.subcategory, "rust");
        assert!(result.confidence >= 0.3);
    }
}
