//! Memory store: conversations, reflections, and insights backed by
//! SQLite, with content-addressed dedup, MinHash fingerprints, and
//! embedding search that degrades gracefully to text search.
//!
//! # Example
//!
//! ```rust,ignore
//! use sb_store::{MemoryStore, StoreConfig};
//!
//! let store = MemoryStore::open(&StoreConfig::file("memory.db")).await?;
//! let id = store.store_conversation("hello", serde_json::json!({})).await?;
//! ```

pub mod embedder;
pub mod error;
pub mod models;
pub mod naming;
pub mod pool;
pub mod schema;
pub mod store;

pub use embedder::{cosine_similarity, text_overlap_score, Embedder, NullEmbedder, EMBEDDING_DIM};
pub use error::{Result, StoreError};
pub use models::{
    Conversation, Insight, InsightsStatistics, Reflection, ScoredResult, SimilarityHit, StoreStats,
};
pub use naming::{is_safe_identifier, validate_identifier};
pub use pool::{create_pool, StoreConfig};
pub use store::{
    content_id, ContentType, DedupReport, DedupStats, DuplicateHit, MemoryStore, DEFAULT_THRESHOLD,
};
