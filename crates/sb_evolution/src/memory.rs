//! The view of a stored memory that the evolution engine operates over.
//!
//! `sb_store` rows carry more than the engine needs (full content,
//! timestamps for other purposes); this is the narrow projection, built
//! by the caller from whichever table (conversations/reflections/insights)
//! it is evolving.

use chrono::{DateTime, Utc};

use sb_fingerprint::MinHashSignature;

#[derive(Debug, Clone)]
pub struct EvolvableMemory {
    pub id: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub fingerprint: Option<MinHashSignature>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub access_count: u32,
}

impl EvolvableMemory {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding: None,
            fingerprint: None,
            last_used_at: None,
            access_count: 0,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: MinHashSignature) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

/// Whitespace-lowercase token set, used for keyword-overlap scoring when
/// no embedding is available.
pub fn keyword_set(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
