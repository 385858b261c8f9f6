//! Typed interface for the embedding collaborator.
//!
//! The original system loads an ONNX sentence-transformer at runtime; that
//! model and its loading machinery are an external concern, not part of
//! this crate. What the store needs is narrower: something that can turn
//! text into a fixed-dimension vector, and a way to know when that
//! something isn't available so search can downgrade gracefully instead
//! of failing.

use async_trait::async_trait;

/// Embedding vector dimension. Matches the `all-MiniLM-L6-v2` model the
/// original embedder wraps; any collaborator implementation must produce
/// vectors of exactly this length.
pub const EMBEDDING_DIM: usize = 384;

/// A collaborator capable of embedding text into [`EMBEDDING_DIM`]-dimensional
/// vectors. Implementations may wrap a local model, a remote API, or (in
/// tests) a deterministic stub.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`, or `None` if the embedder is temporarily unavailable
    /// (model not loaded, remote call failed). Callers fall back to text
    /// search rather than treating this as a hard error.
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;

    /// Whether the embedder is currently able to serve requests. The
    /// store checks this before committing to vector search so it can
    /// decide up front whether to run a semantic or text-only query.
    fn is_available(&self) -> bool;
}

/// Cosine similarity between two equal-length vectors. Returns `0.0` for
/// a zero-length or mismatched pair rather than panicking or dividing by
/// zero, since a denominator of zero means "no information," not an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// Simple whitespace-token overlap score in `[0, 1]`, used when no
/// embedder is available. Not a substitute for semantic search, but a
/// reasonable degraded ranking signal.
pub fn text_overlap_score(query: &str, candidate: &str) -> f64 {
    let q: std::collections::HashSet<String> =
        query.to_lowercase().split_whitespace().map(str::to_string).collect();
    let c: std::collections::HashSet<String> =
        candidate.to_lowercase().split_whitespace().map(str::to_string).collect();
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }
    let overlap = q.intersection(&c).count();
    overlap as f64 / q.len() as f64
}

/// An embedder that is never available. Used as the default collaborator
/// so the store always has *some* [`Embedder`] to hold without requiring
/// callers to wire up a real model just to exercise text search.
pub struct NullEmbedder;

#[async_trait]
impl Embedder for NullEmbedder {
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}
