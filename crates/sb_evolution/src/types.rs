//! Shared data shapes: top-level categories, learned subcategories,
//! assignment results, and evolution snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};

/// The closed set of top-level categories memories are filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Facts,
    Preferences,
    Skills,
    Rules,
    Context,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Facts,
        Category::Preferences,
        Category::Skills,
        Category::Rules,
        Category::Context,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Facts => "facts",
            Category::Preferences => "preferences",
            Category::Skills => "skills",
            Category::Rules => "rules",
            Category::Context => "context",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| EvolutionError::UnknownCategory(s.to_string()))
    }
}

/// A learned, name+keywords cluster under a fixed top-level category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: String,
    pub parent_category: Category,
    pub name: String,
    pub keywords: Vec<String>,
    pub memory_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Number of times memories in this subcategory have been accessed
    /// since it was created or last decayed. Consulted by temporal decay.
    pub access_count: u32,
}

impl Subcategory {
    pub fn new(parent_category: Category, name: impl Into<String>, keywords: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_category,
            name: name.into(),
            keywords,
            memory_count: 0,
            created_at: now,
            updated_at: now,
            last_used_at: None,
            access_count: 0,
        }
    }
}

/// How a memory was mapped to `(category, subcategory)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    FingerprintPrefilter,
    EmbeddingCosine,
    KeywordMatch,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub category: Category,
    pub subcategory: String,
    pub confidence: f64,
    pub method: AssignmentMethod,
}

/// A point-in-time summary of a category's clustering state, recorded
/// before and after an `evolve_category` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySnapshotState {
    pub subcategory_count: usize,
    pub silhouette: f64,
    pub total_memories: usize,
}

/// The outcome of evaluating one subcategory for temporal decay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayResult {
    pub subcategory_id: String,
    pub decayed: bool,
    pub archived: bool,
    pub bytes_freed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionSnapshot {
    pub id: String,
    pub category: Category,
    pub before_state: CategorySnapshotState,
    pub after_state: CategorySnapshotState,
    pub decay_results: Vec<DecayResult>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl EvolutionSnapshot {
    /// Render a human-readable sentence describing the run: interpret
    /// the silhouette delta against fixed thresholds and note the
    /// subcategory-count delta and storage freed.
    pub fn improvement_summary(&self) -> String {
        let delta = self.after_state.silhouette - self.before_state.silhouette;
        let quality = if delta > 0.1 {
            "significant improvement"
        } else if delta > 0.0 {
            "moderate improvement"
        } else if delta > -0.1 {
            "minor change"
        } else {
            "regression"
        };

        let count_delta =
            self.after_state.subcategory_count as i64 - self.before_state.subcategory_count as i64;
        let count_desc = match count_delta.cmp(&0) {
            std::cmp::Ordering::Greater => format!("{count_delta} new subcategories"),
            std::cmp::Ordering::Less => format!("{} subcategories merged away", -count_delta),
            std::cmp::Ordering::Equal => "no change in subcategory count".to_string(),
        };

        let freed: u64 = self.decay_results.iter().map(|d| d.bytes_freed).sum();
        format!(
            "{quality} (silhouette {:.3} -> {:.3}, {count_desc}, {freed} bytes freed by decay)",
            self.before_state.silhouette, self.after_state.silhouette
        )
    }
}
