//! The memory store: conversations, reflections, and insights, with
//! content-addressed dedup, MinHash fingerprinting, and embedding search
//! that degrades to text search when no embedder is wired up.
//!
//! Reflections and insights live in one physical table (see
//! [`crate::schema`]); every reflection query filters `insight_type IS
//! NULL` and every insight query filters `insight_type IS NOT NULL`, so
//! the two views never cross.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use sb_fingerprint::MinHashSignature;

use crate::embedder::{cosine_similarity, text_overlap_score, Embedder, NullEmbedder};
use crate::error::{Result, StoreError};
use crate::models::{
    Conversation, Insight, InsightsStatistics, Reflection, ScoredResult, SimilarityHit, StoreStats,
};
use crate::naming::validate_identifier;
use crate::pool::{create_pool, StoreConfig};
use crate::schema::ensure_schema;

/// Default score floor for search operations that don't specify one.
pub const DEFAULT_THRESHOLD: f64 = 0.0;

/// The memory store. Cheap to clone: the pool is internally reference
/// counted and the embedder is held behind an `Arc`.
#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

/// Deterministic conversation id: the first 16 hex characters of
/// SHA-256(content). Storing identical content twice yields the same id,
/// so a second `store_conversation` call for unchanged content is a
/// touch-and-return rather than a duplicate row.
pub fn content_id(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex = hex_encode(&digest);
    hex[..16].to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn embedding_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vec.len() * 4);
    for f in vec {
        out.extend_from_slice(&f.to_le_bytes());
    }
    out
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

fn parse_ts(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl MemoryStore {
    /// Open (and, if needed, create and migrate) a memory store at
    /// `config`'s location, with no embedding collaborator wired in --
    /// search falls back to text overlap until [`with_embedder`] is used.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        ensure_schema(&pool).await?;
        Ok(Self {
            pool,
            embedder: Arc::new(NullEmbedder),
        })
    }

    /// Attach an embedding collaborator. Existing rows are not
    /// retroactively embedded; only content stored after this call gets
    /// vectors.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn is_semantic_search_available(&self) -> bool {
        self.embedder.is_available()
    }

    // -- conversations ----------------------------------------------------

    /// Store `content` under `metadata`, returning the deterministic id.
    /// A second call with the same content is idempotent: the existing
    /// row's metadata and `updated_at` are refreshed in place, no
    /// duplicate row is created.
    pub async fn store_conversation(&self, content: &str, metadata: Value) -> Result<String> {
        let id = content_id(content);
        let now = Utc::now();
        let metadata_json = serde_json::to_string(&metadata)?;
        let embedding = self.embedder.embed(content).await;
        let fingerprint = MinHashSignature::from_text(content).to_bytes();

        sqlx::query(
            r#"INSERT INTO conversations (id, content, metadata, embedding, fingerprint, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   metadata = excluded.metadata,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&id)
        .bind(content)
        .bind(&metadata_json)
        .bind(embedding.as_deref().map(embedding_to_blob))
        .bind(&fingerprint)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Search conversations by semantic similarity when an embedder is
    /// available, otherwise by substring match against `query`.
    ///
    /// `threshold` is the minimum score a row must clear; `min_score`,
    /// when given, overrides it (a back-compat alias for callers still
    /// on the older parameter name). `project`, when given, restricts
    /// results to rows whose
    /// `metadata.project` equals it.
    pub async fn search_conversations(
        &self,
        query: &str,
        limit: i64,
        threshold: f64,
        min_score: Option<f64>,
        project: Option<&str>,
    ) -> Result<Vec<ScoredResult<Conversation>>> {
        let effective_threshold = min_score.unwrap_or(threshold);
        let rows = sqlx::query(
            "SELECT id, content, metadata, embedding, created_at, updated_at FROM conversations",
        )
        .fetch_all(&self.pool)
        .await?;

        let use_embeddings = self.embedder.is_available();
        let query_embedding = if use_embeddings { self.embedder.embed(query).await } else { None };

        let mut scored: Vec<ScoredResult<Conversation>> = Vec::with_capacity(rows.len());
        for row in rows {
            let content: String = row.try_get("content")?;
            let conversation = row_to_conversation(&row, content.clone())?;

            if let Some(project) = project {
                let matches = conversation
                    .metadata
                    .get("project")
                    .and_then(Value::as_str)
                    .is_some_and(|p| p == project);
                if !matches {
                    continue;
                }
            }

            let (score, keep) = match (&query_embedding, row.try_get::<Option<Vec<u8>>, _>("embedding")?) {
                (Some(qvec), Some(blob)) => {
                    let score = cosine_similarity(qvec, &blob_to_embedding(&blob));
                    (score, score >= effective_threshold)
                }
                _ => (1.0, content.to_lowercase().contains(&query.to_lowercase())),
            };

            if keep {
                scored.push(ScoredResult { item: conversation, score });
            }
        }

        if use_embeddings {
            scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        } else {
            scored.sort_by(|a, b| b.item.updated_at.cmp(&a.item.updated_at));
        }
        scored.truncate(limit.max(0) as usize);
        Ok(scored)
    }

    // -- reflections --------------------------------------------------------

    /// Store a reflection: a fresh UUID id, `insight_type` explicitly
    /// `NULL` so it never surfaces from an insight query.
    pub async fn store_reflection(&self, content: &str, tags: Vec<String>) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let tags_json = serde_json::to_string(&tags)?;
        let embedding = self.embedder.embed(content).await;
        let fingerprint = MinHashSignature::from_text(content).to_bytes();

        sqlx::query(
            r#"INSERT INTO reflections
                   (id, content, tags, metadata, embedding, fingerprint, created_at, updated_at, insight_type)
               VALUES (?, ?, ?, '{}', ?, ?, ?, ?, NULL)"#,
        )
        .bind(&id)
        .bind(content)
        .bind(&tags_json)
        .bind(embedding.as_deref().map(embedding_to_blob))
        .bind(&fingerprint)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Search reflections (`insight_type IS NULL`) semantically when
    /// `use_embeddings` is true and an embedder is available, otherwise
    /// by substring-in-content OR tag match.
    pub async fn search_reflections(
        &self,
        query: &str,
        limit: i64,
        use_embeddings: bool,
    ) -> Result<Vec<ScoredResult<Reflection>>> {
        let rows = sqlx::query(
            "SELECT id, content, tags, metadata, embedding, created_at, updated_at \
             FROM reflections WHERE insight_type IS NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let semantic = use_embeddings && self.embedder.is_available();
        let query_embedding = if semantic { self.embedder.embed(query).await } else { None };
        let query_lower = query.to_lowercase();

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let content: String = row.try_get("content")?;
            let reflection = row_to_reflection(&row, content.clone())?;

            let (score, keep) = match (&query_embedding, row.try_get::<Option<Vec<u8>>, _>("embedding")?) {
                (Some(qvec), Some(blob)) => {
                    let s = cosine_similarity(qvec, &blob_to_embedding(&blob));
                    (s, true)
                }
                _ => {
                    let content_hit = content.to_lowercase().contains(&query_lower);
                    let tag_hit = reflection.tags.iter().any(|t| t.to_lowercase().contains(&query_lower));
                    (1.0, content_hit || tag_hit)
                }
            };

            if keep {
                scored.push(ScoredResult { item: reflection, score });
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit.max(0) as usize);
        Ok(scored)
    }

    /// Fetch a single reflection by id, or `None` if it doesn't exist or
    /// is actually an insight row.
    pub async fn get_reflection_by_id(&self, id: &str) -> Result<Option<Reflection>> {
        let row = sqlx::query(
            "SELECT id, content, tags, metadata, created_at, updated_at \
             FROM reflections WHERE id = ? AND insight_type IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let content: String = row.try_get("content")?;
                Ok(Some(row_to_reflection(&row, content)?))
            }
            None => Ok(None),
        }
    }

    /// Union of [`search_conversations`](Self::search_conversations) and
    /// [`search_reflections`](Self::search_reflections), each hit
    /// labelled with its kind, merged by score and capped at `limit`.
    pub async fn similarity_search(&self, query: &str, limit: i64) -> Result<Vec<SimilarityHit>> {
        let conversations = self
            .search_conversations(query, limit, DEFAULT_THRESHOLD, None, None)
            .await?;
        let reflections = self.search_reflections(query, limit, true).await?;

        let mut hits: Vec<SimilarityHit> = Vec::with_capacity(conversations.len() + reflections.len());
        hits.extend(conversations.into_iter().map(|r| SimilarityHit::Conversation {
            item: r.item,
            score: r.score,
        }));
        hits.extend(reflections.into_iter().map(|r| SimilarityHit::Reflection {
            item: r.item,
            score: r.score,
        }));

        hits.sort_by(|a, b| hit_score(b).partial_cmp(&hit_score(a)).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }

    // -- insights -----------------------------------------------------------

    /// Promote content to an insight: a fresh UUID id, `insight_type`
    /// sanitized against the collection-name allow-list (falling back to
    /// `"general"` rather than erroring), `quality_score` and the two
    /// optional source ids folded into `metadata`, `usage_count` starting
    /// at zero.
    #[allow(clippy::too_many_arguments)]
    pub async fn store_insight(
        &self,
        content: &str,
        insight_type: &str,
        topics: Option<Vec<String>>,
        projects: Option<Vec<String>>,
        source_conversation_id: Option<String>,
        source_reflection_id: Option<String>,
        confidence_score: f64,
        quality_score: f64,
    ) -> Result<String> {
        let insight_type = sanitize_insight_type(insight_type);
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let embedding = self.embedder.embed(content).await;
        let fingerprint = MinHashSignature::from_text(content).to_bytes();

        let mut metadata = serde_json::Map::new();
        metadata.insert("quality_score".to_string(), Value::from(quality_score));
        if let Some(topics) = topics {
            metadata.insert("topics".to_string(), Value::from(topics));
        }
        if let Some(projects) = projects {
            let sanitized: Vec<String> = projects.iter().map(|p| sanitize_project_name(p)).collect();
            metadata.insert("projects".to_string(), Value::from(sanitized));
        }
        if let Some(source) = source_conversation_id {
            metadata.insert("source_conversation_id".to_string(), Value::from(source));
        }
        if let Some(source) = source_reflection_id {
            metadata.insert("source_reflection_id".to_string(), Value::from(source));
        }
        let metadata_json = serde_json::to_string(&Value::Object(metadata))?;

        sqlx::query(
            r#"INSERT INTO reflections
                   (id, content, tags, metadata, embedding, fingerprint, confidence_score,
                    usage_count, created_at, updated_at, insight_type)
               VALUES (?, ?, '[]', ?, ?, ?, ?, 0, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(content)
        .bind(&metadata_json)
        .bind(embedding.as_deref().map(embedding_to_blob))
        .bind(&fingerprint)
        .bind(confidence_score)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(&insight_type)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Search insights (`insight_type IS NOT NULL`), filtered to
    /// `metadata.quality_score >= min_quality_score`, then ranked
    /// semantically (if `use_embeddings` and an embedder is available)
    /// or by text match, post-filtered to `similarity >= min_similarity`.
    ///
    /// `query` of `"*"` or `""` is a wildcard: skips ranking entirely and
    /// returns every insight clearing the quality floor, ordered by
    /// `created_at` descending.
    pub async fn search_insights(
        &self,
        query: &str,
        limit: i64,
        min_quality_score: f64,
        min_similarity: f64,
        use_embeddings: bool,
    ) -> Result<Vec<ScoredResult<Insight>>> {
        let rows = sqlx::query(
            "SELECT id, content, insight_type, metadata, embedding, usage_count, last_used_at, \
             confidence_score, created_at, updated_at FROM reflections WHERE insight_type IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut insights = Vec::with_capacity(rows.len());
        for row in &rows {
            let content: String = row.try_get("content")?;
            let insight = row_to_insight(row, content)?;
            if insight.quality_score() >= min_quality_score {
                insights.push((row, insight));
            }
        }

        let wildcard = query.is_empty() || query == "*";
        if wildcard {
            let mut scored: Vec<ScoredResult<Insight>> = insights
                .into_iter()
                .map(|(_, insight)| ScoredResult { item: insight, score: 1.0 })
                .collect();
            scored.sort_by(|a, b| b.item.created_at.cmp(&a.item.created_at));
            scored.truncate(limit.max(0) as usize);
            return Ok(scored);
        }

        let semantic = use_embeddings && self.embedder.is_available();
        let query_embedding = if semantic { self.embedder.embed(query).await } else { None };

        let mut scored = Vec::with_capacity(insights.len());
        for (row, insight) in insights {
            let score = match (&query_embedding, row.try_get::<Option<Vec<u8>>, _>("embedding")?) {
                (Some(qvec), Some(blob)) => cosine_similarity(qvec, &blob_to_embedding(&blob)),
                _ => text_overlap_score(query, &insight.content),
            };
            if score >= min_similarity {
                scored.push(ScoredResult { item: insight, score });
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit.max(0) as usize);
        Ok(scored)
    }

    /// Bump an insight's usage counter and touch `last_used_at` in a
    /// single statement, so concurrent callers never race a
    /// read-then-write and lose an increment. Returns `true` iff exactly
    /// one row (an existing insight) was updated.
    pub async fn update_insight_usage(&self, id: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE reflections SET usage_count = usage_count + 1, updated_at = ?, last_used_at = ? \
             WHERE id = ? AND insight_type IS NOT NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_insights_statistics(&self) -> Result<InsightsStatistics> {
        let rows = sqlx::query(
            "SELECT insight_type, metadata, usage_count FROM reflections WHERE insight_type IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut total = 0i64;
        let mut quality_sum = 0.0;
        let mut usage_sum = 0.0;
        let mut by_type = std::collections::HashMap::new();

        for row in rows {
            let insight_type: String = row.try_get("insight_type")?;
            let metadata_json: String = row.try_get("metadata")?;
            let usage_count: i64 = row.try_get("usage_count")?;
            let metadata: Value = serde_json::from_str(&metadata_json).unwrap_or(Value::Null);
            let quality = metadata.get("quality_score").and_then(Value::as_f64).unwrap_or(0.5);

            total += 1;
            quality_sum += quality;
            usage_sum += usage_count as f64;
            *by_type.entry(insight_type).or_insert(0) += 1;
        }

        Ok(InsightsStatistics {
            total,
            avg_quality: if total > 0 { quality_sum / total as f64 } else { 0.0 },
            avg_usage: if total > 0 { usage_sum / total as f64 } else { 0.0 },
            by_type,
        })
    }

    // -- maintenance ----------------------------------------------------------

    /// A cheap liveness check: can we round-trip a query through the pool.
    pub async fn health_check(&self) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }

    /// Row counts across every table, plus whether semantic search is
    /// currently available.
    pub async fn get_stats(&self) -> Result<StoreStats> {
        let conversations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;
        let reflections: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reflections WHERE insight_type IS NULL")
                .fetch_one(&self.pool)
                .await?;
        let insights: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reflections WHERE insight_type IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(StoreStats {
            conversations,
            reflections,
            insights,
            semantic_search_available: self.is_semantic_search_available(),
        })
    }

    /// Drop every row from every table. Used by tests and by the
    /// `reset` maintenance command; schema itself is left intact.
    pub async fn reset_database(&self) -> Result<()> {
        sqlx::query("DELETE FROM reflections").execute(&self.pool).await?;
        sqlx::query("DELETE FROM conversations").execute(&self.pool).await?;
        sqlx::query("DELETE FROM code_graphs").execute(&self.pool).await?;
        Ok(())
    }

    // -- fingerprint-based deduplication (C3) ----------------------------------

    /// Every stored fingerprint of `content_type`, paired with its row id
    /// and content, for duplicate-scanning operations.
    async fn fingerprints_of(&self, content_type: ContentType) -> Result<Vec<(String, String, MinHashSignature)>> {
        let rows = match content_type {
            ContentType::Conversation => {
                sqlx::query("SELECT id, content, fingerprint FROM conversations WHERE fingerprint IS NOT NULL")
                    .fetch_all(&self.pool)
                    .await?
            }
            ContentType::Reflection => {
                sqlx::query(
                    "SELECT id, content, fingerprint FROM reflections \
                     WHERE insight_type IS NULL AND fingerprint IS NOT NULL",
                )
                .fetch_all(&self.pool)
                .await?
            }
            ContentType::Insight => {
                sqlx::query(
                    "SELECT id, content, fingerprint FROM reflections \
                     WHERE insight_type IS NOT NULL AND fingerprint IS NOT NULL",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let content: String = row.try_get("content")?;
            let blob: Vec<u8> = row.try_get("fingerprint")?;
            let sig = MinHashSignature::from_bytes(&blob)
                .map_err(|e| StoreError::DataIntegrity(format!("fingerprint for {id}: {e}")))?;
            out.push((id, content, sig));
        }
        Ok(out)
    }

    /// Every stored row of `content_type` whose fingerprint has Jaccard
    /// similarity `>= threshold` with `content`'s, ordered by similarity
    /// descending.
    pub async fn find_duplicates(
        &self,
        content_type: ContentType,
        content: &str,
        threshold: f64,
    ) -> Result<Vec<DuplicateHit>> {
        let target = MinHashSignature::from_text(content);
        let candidates = self.fingerprints_of(content_type).await?;

        let mut hits: Vec<DuplicateHit> = candidates
            .into_iter()
            .map(|(id, candidate_content, sig)| DuplicateHit {
                id,
                content: candidate_content,
                similarity: target.estimate_jaccard_similarity(&sig),
            })
            .filter(|hit| hit.similarity >= threshold)
            .collect();

        hits.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }

    /// Database-wide duplicate statistics for `content_type`: every
    /// pairwise cluster of rows whose fingerprints agree at `>=
    /// threshold`. Clusters are formed as connected components under the
    /// similarity relation, so a chain of near-duplicates counts as one
    /// group even if no two endpoints individually clear the threshold.
    pub async fn dedup_stats(&self, content_type: ContentType, threshold: f64) -> Result<DedupStats> {
        let rows = self.fingerprints_of(content_type).await?;
        let clusters = duplicate_clusters(&rows, threshold);
        let duplicate_rows: usize = clusters.iter().map(|c| c.len().saturating_sub(1)).sum();

        Ok(DedupStats {
            total_rows: rows.len(),
            duplicate_groups: clusters.len(),
            duplicate_rows,
        })
    }

    /// Resolve duplicate clusters of `content_type` at `threshold`,
    /// keeping the first row (stored order, i.e. insertion order) of each
    /// cluster and either reporting (dry run) or deleting (destructive)
    /// the rest.
    pub async fn deduplicate(
        &self,
        content_type: ContentType,
        threshold: f64,
        dry_run: bool,
    ) -> Result<DedupReport> {
        let rows = self.fingerprints_of(content_type).await?;
        let clusters = duplicate_clusters(&rows, threshold);

        let mut removed_ids = Vec::new();
        for cluster in &clusters {
            for id in &cluster[1..] {
                removed_ids.push(id.clone());
            }
        }

        if !dry_run {
            let table = content_type.table();
            let extra_clause = content_type.insight_clause();
            for id in &removed_ids {
                let sql = format!("DELETE FROM {table} WHERE id = ? {extra_clause}");
                sqlx::query(&sql).bind(id).execute(&self.pool).await?;
            }
        }

        Ok(DedupReport {
            duplicate_groups: clusters.len(),
            rows_removed: removed_ids.len(),
            dry_run,
            removed_ids,
        })
    }
}

fn hit_score(hit: &SimilarityHit) -> f64 {
    match hit {
        SimilarityHit::Conversation { score, .. } => *score,
        SimilarityHit::Reflection { score, .. } => *score,
    }
}

fn sanitize_insight_type(raw: &str) -> String {
    if validate_identifier(raw).is_ok() {
        raw.to_string()
    } else {
        "general".to_string()
    }
}

/// Sanitize a project name for storage in insight metadata: lowercase,
/// ASCII alphanumeric/`-`/`_` only, truncated to a sane length. Unlike
/// `insight_type`, a project name never gates SQL identifiers, so this
/// is cosmetic normalization rather than an injection defense.
fn sanitize_project_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    cleaned.chars().take(64).collect()
}

/// Which table (and, for the shared `reflections` table, which side of
/// the `insight_type` split) a fingerprint/dedup operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Conversation,
    Reflection,
    Insight,
}

impl ContentType {
    fn table(self) -> &'static str {
        match self {
            ContentType::Conversation => "conversations",
            ContentType::Reflection | ContentType::Insight => "reflections",
        }
    }

    fn insight_clause(self) -> &'static str {
        match self {
            ContentType::Conversation => "",
            ContentType::Reflection => "AND insight_type IS NULL",
            ContentType::Insight => "AND insight_type IS NOT NULL",
        }
    }
}

/// A single duplicate candidate from [`MemoryStore::find_duplicates`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct DuplicateHit {
    pub id: String,
    pub content: String,
    pub similarity: f64,
}

/// Database-wide duplicate counts for [`MemoryStore::dedup_stats`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct DedupStats {
    pub total_rows: usize,
    pub duplicate_groups: usize,
    pub duplicate_rows: usize,
}

/// Outcome of [`MemoryStore::deduplicate`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct DedupReport {
    pub duplicate_groups: usize,
    pub rows_removed: usize,
    pub dry_run: bool,
    pub removed_ids: Vec<String>,
}

/// Group `rows` into connected components under "Jaccard similarity `>=
/// threshold`", preserving each row's original relative order within its
/// cluster so "keep the first, drop the rest" is deterministic.
fn duplicate_clusters(rows: &[(String, String, MinHashSignature)], threshold: f64) -> Vec<Vec<String>> {
    let n = rows.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if rows[i].2.estimate_jaccard_similarity(&rows[j].2) >= threshold {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }

    let mut groups: std::collections::HashMap<usize, Vec<String>> = std::collections::HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(rows[i].0.clone());
    }

    groups.into_values().filter(|g| g.len() > 1).collect()
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow, content: String) -> Result<Conversation> {
    let metadata: String = row.try_get("metadata")?;
    Ok(Conversation {
        id: row.try_get("id")?,
        content,
        metadata: serde_json::from_str(&metadata)?,
        created_at: parse_ts(row.try_get("created_at")?),
        updated_at: parse_ts(row.try_get("updated_at")?),
    })
}

fn row_to_reflection(row: &sqlx::sqlite::SqliteRow, content: String) -> Result<Reflection> {
    let metadata: String = row.try_get("metadata")?;
    let tags: String = row.try_get("tags")?;
    Ok(Reflection {
        id: row.try_get("id")?,
        content,
        tags: serde_json::from_str(&tags)?,
        metadata: serde_json::from_str(&metadata)?,
        created_at: parse_ts(row.try_get("created_at")?),
        updated_at: parse_ts(row.try_get("updated_at")?),
    })
}

fn row_to_insight(row: &sqlx::sqlite::SqliteRow, content: String) -> Result<Insight> {
    let metadata: String = row.try_get("metadata")?;
    let last_used_at: Option<String> = row.try_get("last_used_at")?;
    Ok(Insight {
        id: row.try_get("id")?,
        content,
        insight_type: row.try_get::<Option<String>, _>("insight_type")?.unwrap_or_default(),
        metadata: serde_json::from_str(&metadata)?,
        usage_count: row.try_get("usage_count")?,
        last_used_at: last_used_at.map(parse_ts),
        confidence_score: row.try_get("confidence_score")?,
        created_at: parse_ts(row.try_get("created_at")?),
        updated_at: parse_ts(row.try_get("updated_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open() -> MemoryStore {
        MemoryStore::open(&StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn content_id_is_deterministic_and_matches_known_vector() {
        assert_eq!(content_id("hello"), "2cf24dba5fb0a30e");
    }

    #[tokio::test]
    async fn storing_same_content_twice_is_idempotent() {
        let store = open().await;
        let id1 = store.store_conversation("hello", serde_json::json!({})).await.unwrap();
        let id2 = store.store_conversation("hello", serde_json::json!({})).await.unwrap();
        assert_eq!(id1, id2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn search_conversations_falls_back_to_text_overlap_without_embedder() {
        let store = open().await;
        store
            .store_conversation("async rust worker pools are fun", serde_json::json!({}))
            .await
            .unwrap();
        store
            .store_conversation("baking bread on a sunday morning", serde_json::json!({}))
            .await
            .unwrap();

        assert!(!store.is_semantic_search_available());
        let results = store
            .search_conversations("rust worker pools", 5, DEFAULT_THRESHOLD, None, None)
            .await
            .unwrap();
        assert_eq!(results[0].item.content, "async rust worker pools are fun");
    }

    #[tokio::test]
    async fn search_conversations_filters_by_project_metadata() {
        let store = open().await;
        store
            .store_conversation("alpha project note", serde_json::json!({"project": "alpha"}))
            .await
            .unwrap();
        store
            .store_conversation("beta project note", serde_json::json!({"project": "beta"}))
            .await
            .unwrap();

        let results = store
            .search_conversations("note", 10, DEFAULT_THRESHOLD, None, Some("alpha"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.metadata["project"], "alpha");
    }

    #[tokio::test]
    async fn store_reflection_is_not_visible_to_insight_search() {
        let store = open().await;
        store.store_reflection("note about pipelines", vec!["rust".into()]).await.unwrap();

        let insights = store
            .search_insights("*", 10, 0.0, 0.0, false)
            .await
            .unwrap();
        assert!(insights.is_empty());

        let reflections = store.search_reflections("pipelines", 10, false).await.unwrap();
        assert_eq!(reflections.len(), 1);
    }

    #[tokio::test]
    async fn store_insight_is_not_visible_to_reflection_search() {
        let store = open().await;
        store
            .store_insight("prefer pipeline() over parallel()", "pattern", None, None, None, None, 0.8, 0.9)
            .await
            .unwrap();

        let reflections = store.search_reflections("pipeline", 10, false).await.unwrap();
        assert!(reflections.is_empty());

        let insights = store.search_insights("*", 10, 0.0, 0.0, false).await.unwrap();
        assert_eq!(insights.len(), 1);
    }

    #[tokio::test]
    async fn store_insight_sanitizes_unsafe_insight_type() {
        let store = open().await;
        let id = store
            .store_insight("note", "bad; type", None, None, None, None, 0.5, 0.5)
            .await
            .unwrap();

        let stats = store.get_insights_statistics().await.unwrap();
        assert_eq!(stats.by_type.get("general"), Some(&1));
        assert!(store.get_reflection_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_insights_filters_by_quality_score() {
        let store = open().await;
        store
            .store_insight("low quality note", "fact", None, None, None, None, 0.5, 0.1)
            .await
            .unwrap();
        store
            .store_insight("high quality note", "fact", None, None, None, None, 0.5, 0.9)
            .await
            .unwrap();

        let results = store.search_insights("*", 10, 0.5, 0.0, false).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.content, "high quality note");
    }

    #[tokio::test]
    async fn search_insights_wildcard_orders_by_created_at_desc() {
        let store = open().await;
        let first = store
            .store_insight("first", "fact", None, None, None, None, 0.5, 0.5)
            .await
            .unwrap();
        let second = store
            .store_insight("second", "fact", None, None, None, None, 0.5, 0.5)
            .await
            .unwrap();

        let results = store.search_insights("", 10, 0.0, 0.0, false).await.unwrap();
        assert_eq!(results[0].item.id, second);
        assert_eq!(results[1].item.id, first);
    }

    #[tokio::test]
    async fn update_insight_usage_increments_atomically() {
        let store = open().await;
        let id = store
            .store_insight("prefer pipeline() over parallel()", "pattern", None, None, None, None, 0.8, 0.5)
            .await
            .unwrap();

        assert!(store.update_insight_usage(&id).await.unwrap());
        assert!(store.update_insight_usage(&id).await.unwrap());

        let stats = store.get_insights_statistics().await.unwrap();
        assert_eq!(stats.avg_usage, 2.0);
    }

    #[tokio::test]
    async fn update_insight_usage_returns_false_for_unknown_id() {
        let store = open().await;
        assert!(!store.update_insight_usage("nope").await.unwrap());
    }

    #[tokio::test]
    async fn update_insight_usage_does_not_touch_reflections() {
        let store = open().await;
        let id = store.store_reflection("a plain reflection", vec![]).await.unwrap();
        assert!(!store.update_insight_usage(&id).await.unwrap());
    }

    #[tokio::test]
    async fn get_stats_counts_each_table_correctly() {
        let store = open().await;
        store.store_conversation("hi", serde_json::json!({})).await.unwrap();
        store.store_reflection("note", vec![]).await.unwrap();
        store
            .store_insight("insight", "fact", None, None, None, None, 0.5, 0.5)
            .await
            .unwrap();

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.conversations, 1);
        assert_eq!(stats.reflections, 1);
        assert_eq!(stats.insights, 1);
    }

    #[tokio::test]
    async fn reset_database_clears_all_tables() {
        let store = open().await;
        store.store_conversation("hello", serde_json::json!({})).await.unwrap();
        store.store_reflection("note", vec![]).await.unwrap();
        store.reset_database().await.unwrap();

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.conversations, 0);
        assert_eq!(stats.reflections, 0);
        assert_eq!(stats.insights, 0);
    }

    #[tokio::test]
    async fn health_check_reports_true_on_live_pool() {
        let store = open().await;
        assert!(store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn find_duplicates_orders_by_similarity_descending() {
        let store = open().await;
        store
            .store_conversation("the quick brown fox jumps over the lazy dog", serde_json::json!({}))
            .await
            .unwrap();
        store
            .store_conversation("the quick brown fox jumps over the lazy dog!", serde_json::json!({}))
            .await
            .unwrap();
        store
            .store_conversation("a completely unrelated sentence about rust", serde_json::json!({}))
            .await
            .unwrap();

        let hits = store
            .find_duplicates(
                ContentType::Conversation,
                "the quick brown fox jumps over the lazy dog",
                0.5,
            )
            .await
            .unwrap();
        assert!(!hits.is_empty());
        assert!(hits[0].similarity >= hits.last().unwrap().similarity);
    }

    #[tokio::test]
    async fn dedup_stats_counts_one_group_for_three_near_duplicates() {
        let store = open().await;
        for suffix in ["", "!", "?"] {
            store
                .store_conversation(
                    &format!("the quick brown fox jumps over the lazy dog{suffix}"),
                    serde_json::json!({}),
                )
                .await
                .unwrap();
        }
        store
            .store_conversation("a totally different unrelated topic entirely", serde_json::json!({}))
            .await
            .unwrap();

        let stats = store.dedup_stats(ContentType::Conversation, 0.8).await.unwrap();
        assert_eq!(stats.duplicate_groups, 1);
        assert_eq!(stats.duplicate_rows, 2);
    }

    #[tokio::test]
    async fn deduplicate_dry_run_does_not_delete_rows() {
        let store = open().await;
        store
            .store_conversation("the quick brown fox jumps over the lazy dog", serde_json::json!({}))
            .await
            .unwrap();
        store
            .store_conversation("the quick brown fox jumps over the lazy dog!", serde_json::json!({}))
            .await
            .unwrap();

        let report = store.deduplicate(ContentType::Conversation, 0.8, true).await.unwrap();
        assert_eq!(report.rows_removed, 1);
        assert!(report.dry_run);

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.conversations, 2);
    }

    #[tokio::test]
    async fn deduplicate_destructive_removes_rows() {
        let store = open().await;
        store
            .store_conversation("the quick brown fox jumps over the lazy dog", serde_json::json!({}))
            .await
            .unwrap();
        store
            .store_conversation("the quick brown fox jumps over the lazy dog!", serde_json::json!({}))
            .await
            .unwrap();

        let report = store.deduplicate(ContentType::Conversation, 0.8, false).await.unwrap();
        assert_eq!(report.rows_removed, 1);

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.conversations, 1);
    }
}
