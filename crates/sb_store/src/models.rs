//! Row shapes stored and returned by the memory store.
//!
//! `Reflection` and `Insight` are two views over the same physical table
//! (see [`crate::schema`]): a row with `insight_type IS NULL` is a plain
//! reflection, a row with `insight_type` set is an insight. The
//! invariant holds at the query layer, not in these structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A piece of raw conversational content, deduplicated by content hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    /// First 16 hex characters of SHA-256(content) -- deterministic, so
    /// storing the same content twice is a no-op rather than a duplicate row.
    pub id: String,
    pub content: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user- or system-authored note, tagged and embedded but not yet
/// promoted to an insight. `insight_type` is always `None` for rows
/// returned through the reflection API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reflection {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reflection promoted to structured, rankable form: typed, scored,
/// and usage-tracked. `metadata` carries `quality_score` and the
/// optional `source_conversation_id` / `source_reflection_id` this
/// insight was distilled from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub id: String,
    pub content: String,
    pub insight_type: String,
    pub metadata: Value,
    pub usage_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Insight {
    /// `metadata.quality_score`, defaulting to `0.5` if absent or not a number.
    pub fn quality_score(&self) -> f64 {
        self.metadata
            .get("quality_score")
            .and_then(Value::as_f64)
            .unwrap_or(0.5)
    }
}

/// A scored search hit: the stored row plus how well it matched the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult<T> {
    pub item: T,
    /// Cosine similarity in `[-1, 1]` for embedding search, or a simple
    /// text-overlap score in `[0, 1]` when running in the downgraded
    /// text-search mode (see [`crate::embedder`]).
    pub score: f64,
}

/// A hit from [`crate::store::MemoryStore::similarity_search`], which
/// unions conversations and reflections and labels each with its kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimilarityHit {
    Conversation { item: Conversation, score: f64 },
    Reflection { item: Reflection, score: f64 },
}

/// Aggregate statistics over a collection's insights.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InsightsStatistics {
    pub total: i64,
    pub avg_quality: f64,
    pub avg_usage: f64,
    pub by_type: std::collections::HashMap<String, i64>,
}

/// Overall store liveness/size snapshot, for the `get_stats` operation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreStats {
    pub conversations: i64,
    pub reflections: i64,
    pub insights: i64,
    pub semantic_search_available: bool,
}
