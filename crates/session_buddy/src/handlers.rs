//! Tool dispatch: each named tool operation maps to one match arm here,
//! deserializing its `arguments` and serializing its result. Input
//! validation happens before anything mutates state, so a bad request
//! never partially applies.

use std::str::FromStr;
use std::time::Duration;

use sb_evolution::{AssignmentResult, Category, EvolvableMemory};
use sb_fingerprint::MinHashSignature;
use sb_protocol::{ErrorKind, ToolError, ToolRequest, ToolResponse};
use sb_store::{ContentType, DEFAULT_THRESHOLD};
use sb_worker::RoutingStrategy;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::IntoToolError;
use crate::state::{AppState, DEFAULT_POOL_ID};

const DEFAULT_SEARCH_LIMIT: i64 = 10;
const DEFAULT_TASK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DEDUP_THRESHOLD: f64 = 0.85;

pub async fn dispatch(state: &AppState, request: ToolRequest) -> ToolResponse {
    let id = request.id.clone();
    match run(state, &request).await {
        Ok(result) => ToolResponse::ok(id, result),
        Err(error) => ToolResponse::err(id, error),
    }
}

async fn run(state: &AppState, request: &ToolRequest) -> Result<Value, ToolError> {
    match request.tool.as_str() {
        "store_conversation" => store_conversation(state, &request.arguments).await,
        "search_conversations" => search_conversations(state, &request.arguments).await,
        "store_reflection" => store_reflection(state, &request.arguments).await,
        "search_reflections" => search_reflections(state, &request.arguments).await,
        "get_reflection_by_id" => get_reflection_by_id(state, &request.arguments).await,
        "similarity_search" => similarity_search(state, &request.arguments).await,
        "store_insight" => store_insight(state, &request.arguments).await,
        "search_insights" => search_insights(state, &request.arguments).await,
        "update_insight_usage" => update_insight_usage(state, &request.arguments).await,
        "get_insights_statistics" => get_insights_statistics(state).await,
        "find_duplicates" => find_duplicates(state, &request.arguments).await,
        "dedup_stats" => dedup_stats(state, &request.arguments).await,
        "deduplicate" => deduplicate(state, &request.arguments).await,
        "create_checkpoint" => create_checkpoint(&request.arguments).await,
        "execute_task" => execute_task(state, &request.arguments).await,
        "execute_batch" => execute_batch(state, &request.arguments).await,
        "route_task" => route_task(state, &request.arguments).await,
        "sync_memories" => sync_memories(state, &request.arguments).await,
        "evolve_category" => evolve_category(state, &request.arguments).await,
        "assign_subcategory" => assign_subcategory(state, &request.arguments).await,
        "get_stats" => get_stats(state).await,
        "health" => health(state).await,
        other => Err(ToolError::validation(format!("unknown tool '{other}'"))),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone())
        .map_err(|e| ToolError::validation(format!("invalid arguments: {e}")))
}

// -- conversations --------------------------------------------------------

#[derive(Deserialize)]
struct StoreConversationArgs {
    content: String,
    #[serde(default)]
    metadata: Value,
}

async fn store_conversation(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: StoreConversationArgs = parse_args(args)?;
    let id = state
        .store
        .store_conversation(&args.content, args.metadata)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "id": id }))
}

#[derive(Deserialize)]
struct SearchConversationsArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    min_score: Option<f64>,
    #[serde(default)]
    project: Option<String>,
}

async fn search_conversations(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: SearchConversationsArgs = parse_args(args)?;
    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let threshold = args.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let results = state
        .store
        .search_conversations(&args.query, limit, threshold, args.min_score, args.project.as_deref())
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "results": results }))
}

// -- reflections ------------------------------------------------------------

#[derive(Deserialize)]
struct StoreReflectionArgs {
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

async fn store_reflection(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: StoreReflectionArgs = parse_args(args)?;
    let id = state
        .store
        .store_reflection(&args.content, args.tags)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "id": id }))
}

#[derive(Deserialize)]
struct SearchReflectionsArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default = "default_true")]
    use_embeddings: bool,
}

async fn search_reflections(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: SearchReflectionsArgs = parse_args(args)?;
    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = state
        .store
        .search_reflections(&args.query, limit, args.use_embeddings)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "results": results }))
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

async fn get_reflection_by_id(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: IdArgs = parse_args(args)?;
    let reflection = state
        .store
        .get_reflection_by_id(&args.id)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "reflection": reflection }))
}

#[derive(Deserialize)]
struct SimilaritySearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

async fn similarity_search(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: SimilaritySearchArgs = parse_args(args)?;
    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = state
        .store
        .similarity_search(&args.query, limit)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "results": results }))
}

// -- insights ---------------------------------------------------------------

#[derive(Deserialize)]
struct StoreInsightArgs {
    content: String,
    insight_type: String,
    #[serde(default)]
    topics: Option<Vec<String>>,
    #[serde(default)]
    projects: Option<Vec<String>>,
    #[serde(default)]
    source_conversation_id: Option<String>,
    #[serde(default)]
    source_reflection_id: Option<String>,
    #[serde(default = "default_confidence")]
    confidence_score: f64,
    #[serde(default = "default_confidence")]
    quality_score: f64,
}

fn default_confidence() -> f64 {
    0.5
}

async fn store_insight(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: StoreInsightArgs = parse_args(args)?;
    let id = state
        .store
        .store_insight(
            &args.content,
            &args.insight_type,
            args.topics,
            args.projects,
            args.source_conversation_id,
            args.source_reflection_id,
            args.confidence_score,
            args.quality_score,
        )
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "id": id }))
}

#[derive(Deserialize)]
struct SearchInsightsArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    min_quality_score: f64,
    #[serde(default)]
    min_similarity: f64,
    #[serde(default = "default_true")]
    use_embeddings: bool,
}

async fn search_insights(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: SearchInsightsArgs = parse_args(args)?;
    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = state
        .store
        .search_insights(&args.query, limit, args.min_quality_score, args.min_similarity, args.use_embeddings)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "results": results }))
}

async fn update_insight_usage(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: IdArgs = parse_args(args)?;
    let updated = state
        .store
        .update_insight_usage(&args.id)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "updated": updated }))
}

async fn get_insights_statistics(state: &AppState) -> Result<Value, ToolError> {
    let stats = state
        .store
        .get_insights_statistics()
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(serde_json::to_value(stats).expect("InsightsStatistics always serializes"))
}

// -- fingerprint deduplication ------------------------------------------------

fn parse_content_type(raw: &str) -> Result<ContentType, ToolError> {
    match raw {
        "conversation" => Ok(ContentType::Conversation),
        "reflection" => Ok(ContentType::Reflection),
        "insight" => Ok(ContentType::Insight),
        other => Err(ToolError::validation(format!(
            "unknown content_type '{other}', expected conversation/reflection/insight"
        ))),
    }
}

#[derive(Deserialize)]
struct FindDuplicatesArgs {
    content_type: String,
    content: String,
    #[serde(default = "default_dedup_threshold")]
    threshold: f64,
}

fn default_dedup_threshold() -> f64 {
    DEFAULT_DEDUP_THRESHOLD
}

async fn find_duplicates(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: FindDuplicatesArgs = parse_args(args)?;
    let content_type = parse_content_type(&args.content_type)?;
    let hits = state
        .store
        .find_duplicates(content_type, &args.content, args.threshold)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "duplicates": hits }))
}

#[derive(Deserialize)]
struct DedupStatsArgs {
    content_type: String,
    #[serde(default = "default_dedup_threshold")]
    threshold: f64,
}

async fn dedup_stats(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: DedupStatsArgs = parse_args(args)?;
    let content_type = parse_content_type(&args.content_type)?;
    let stats = state
        .store
        .dedup_stats(content_type, args.threshold)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(serde_json::to_value(stats).expect("DedupStats always serializes"))
}

#[derive(Deserialize)]
struct DeduplicateArgs {
    content_type: String,
    #[serde(default = "default_dedup_threshold")]
    threshold: f64,
    #[serde(default = "default_true")]
    dry_run: bool,
}

async fn deduplicate(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: DeduplicateArgs = parse_args(args)?;
    let content_type = parse_content_type(&args.content_type)?;
    let report = state
        .store
        .deduplicate(content_type, args.threshold, args.dry_run)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(serde_json::to_value(report).expect("DedupReport always serializes"))
}

// -- checkpoint / git ---------------------------------------------------------

#[derive(Deserialize)]
struct CheckpointArgs {
    dir: String,
    project: String,
    #[serde(default = "default_quality_score")]
    quality_score: u8,
}

fn default_quality_score() -> u8 {
    80
}

async fn create_checkpoint(args: &Value) -> Result<Value, ToolError> {
    let args: CheckpointArgs = parse_args(args)?;
    let (outcome, lines) =
        sb_git::create_checkpoint_commit(std::path::Path::new(&args.dir), &args.project, args.quality_score)
            .map_err(IntoToolError::into_tool_error)?;
    let (status, commit) = match outcome {
        sb_git::CheckpointOutcome::Clean => ("clean", None),
        sb_git::CheckpointOutcome::Committed(hash) => ("committed", Some(hash)),
        sb_git::CheckpointOutcome::UntrackedOnly => ("untracked_only", None),
        sb_git::CheckpointOutcome::Failed(reason) => {
            return Err(ToolError::new(ErrorKind::Fatal, reason));
        }
    };
    Ok(json!({ "status": status, "commit": commit, "lines": lines }))
}

// -- worker pools -------------------------------------------------------------

#[derive(Deserialize)]
struct ExecuteTaskArgs {
    prompt: String,
    #[serde(default)]
    context: Value,
    #[serde(default)]
    pool_id: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

async fn execute_task(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: ExecuteTaskArgs = parse_args(args)?;
    let pool_id = args.pool_id.as_deref().unwrap_or(DEFAULT_POOL_ID);
    let timeout = Duration::from_secs(args.timeout_seconds.unwrap_or(DEFAULT_TASK_TIMEOUT_SECS));
    let result = state
        .pools
        .execute_on_pool(pool_id, &args.prompt, args.context, timeout)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(result)
}

#[derive(Deserialize)]
struct ExecuteBatchArgs {
    prompts: Vec<String>,
    #[serde(default)]
    context: Value,
    #[serde(default)]
    pool_id: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

/// Runs every prompt concurrently against one pool. A per-task failure is
/// preserved in place as `{"error": ...}` rather than aborting the batch,
/// so the response always has one entry per input prompt.
async fn execute_batch(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: ExecuteBatchArgs = parse_args(args)?;
    let pool_id = args.pool_id.as_deref().unwrap_or(DEFAULT_POOL_ID);
    let timeout = Duration::from_secs(args.timeout_seconds.unwrap_or(DEFAULT_TASK_TIMEOUT_SECS));

    let futures = args.prompts.iter().map(|prompt| {
        let context = args.context.clone();
        async move {
            state
                .pools
                .execute_on_pool(pool_id, prompt, context, timeout)
                .await
        }
    });

    let outcomes = futures::future::join_all(futures).await;
    let results: Vec<Value> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(value) => json!({ "ok": value }),
            Err(err) => json!({ "error": err.to_string() }),
        })
        .collect();
    Ok(json!({ "results": results }))
}

#[derive(Deserialize)]
struct RouteTaskArgs {
    prompt: String,
    #[serde(default)]
    context: Value,
    #[serde(default = "default_strategy")]
    strategy: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

fn default_strategy() -> String {
    "least_loaded".to_string()
}

async fn route_task(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: RouteTaskArgs = parse_args(args)?;
    let strategy =
        RoutingStrategy::from_str(&args.strategy).map_err(IntoToolError::into_tool_error)?;
    let timeout = Duration::from_secs(args.timeout_seconds.unwrap_or(DEFAULT_TASK_TIMEOUT_SECS));
    let (pool_id, result) = state
        .pools
        .route_task(&args.prompt, args.context, strategy, timeout)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "pool_id": pool_id, "result": result }))
}

// -- sync ----------------------------------------------------------------------

#[derive(Deserialize)]
struct SyncMemoriesArgs {
    #[serde(default)]
    force_method: Option<String>,
    #[serde(default)]
    files: Vec<String>,
}

async fn sync_memories(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: SyncMemoriesArgs = parse_args(args)?;
    let paths: Vec<std::path::PathBuf> = args.files.iter().map(std::path::PathBuf::from).collect();
    let refs: Vec<&std::path::Path> = paths.iter().map(|p| p.as_path()).collect();
    let system_id = state.config.resolved_system_id();

    let outcome = state
        .sync
        .sync_memories(args.force_method.as_deref(), &system_id, &refs)
        .await
        .map_err(IntoToolError::into_tool_error)?;
    Ok(json!({ "method": outcome.method, "manifest": outcome.manifest }))
}

// -- category evolution -----------------------------------------------------

#[derive(Deserialize)]
struct EvolvableMemoryArg {
    id: String,
    content: String,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    access_count: u32,
}

#[derive(Deserialize)]
struct EvolveCategoryArgs {
    category: String,
    memories: Vec<EvolvableMemoryArg>,
}

async fn evolve_category(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: EvolveCategoryArgs = parse_args(args)?;
    let category = Category::parse(&args.category).map_err(IntoToolError::into_tool_error)?;

    let memories: Vec<EvolvableMemory> = args
        .memories
        .into_iter()
        .map(|m| {
            let mut memory = EvolvableMemory::new(m.id, &m.content)
                .with_fingerprint(MinHashSignature::from_text(&m.content));
            if let Some(embedding) = m.embedding {
                memory = memory.with_embedding(embedding);
            }
            memory.access_count = m.access_count;
            memory
        })
        .collect();

    let snapshot = state
        .evolution
        .evolve_category(category, &memories, &state.evolution_config)
        .map_err(IntoToolError::into_tool_error)?;

    let summary = snapshot.improvement_summary();
    let mut value = serde_json::to_value(snapshot).expect("EvolutionSnapshot always serializes");
    value["summary"] = json!(summary);
    Ok(value)
}

#[derive(Deserialize)]
struct AssignSubcategoryArgs {
    id: String,
    content: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default = "default_true")]
    use_fingerprint_prefilter: bool,
}

fn default_true() -> bool {
    true
}

async fn assign_subcategory(state: &AppState, args: &Value) -> Result<Value, ToolError> {
    let args: AssignSubcategoryArgs = parse_args(args)?;
    let category = args
        .category
        .as_deref()
        .map(Category::parse)
        .transpose()
        .map_err(IntoToolError::into_tool_error)?;

    let mut memory =
        EvolvableMemory::new(&args.id, &args.content).with_fingerprint(MinHashSignature::from_text(&args.content));
    if let Some(embedding) = args.embedding {
        memory = memory.with_embedding(embedding);
    }

    let assignment: AssignmentResult = state.evolution.assign_subcategory(
        &memory,
        category,
        &state.evolution_config,
        args.use_fingerprint_prefilter,
    );
    Ok(serde_json::to_value(assignment).expect("AssignmentResult always serializes"))
}

// -- maintenance ---------------------------------------------------------------

async fn get_stats(state: &AppState) -> Result<Value, ToolError> {
    let stats = state.store.get_stats().await.map_err(IntoToolError::into_tool_error)?;
    Ok(serde_json::to_value(stats).expect("StoreStats always serializes"))
}

// -- health --------------------------------------------------------------------

async fn health(state: &AppState) -> Result<Value, ToolError> {
    let store_ok = state.store.health_check().await.unwrap_or(false);
    let pool_health = state.pools.get_health_status().await;
    Ok(json!({
        "store_healthy": store_ok,
        "semantic_search_available": state.store.is_semantic_search_available(),
        "pools": pool_health,
    }))
}
