//! Integration tests against the tool dispatch surface, exercising the
//! handler layer the way a transport (stdio or HTTP) would.

use sb_protocol::{SessionBuddyConfig, ToolRequest};
use serde_json::json;
use session_buddy::handlers::dispatch;
use session_buddy::state::AppState;

async fn test_state() -> AppState {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SessionBuddyConfig::default();
    config.database_path = dir.path().join("memory.db");
    // Leak the tempdir so the database file outlives the state for the
    // duration of the test; cleaned up when the process exits.
    std::mem::forget(dir);
    AppState::new(config).await.unwrap()
}

fn request(tool: &str, arguments: serde_json::Value) -> ToolRequest {
    ToolRequest { id: "t1".to_string(), tool: tool.to_string(), arguments }
}

#[tokio::test]
async fn store_and_search_conversation_round_trips() {
    let state = test_state().await;

    let stored = dispatch(
        &state,
        request("store_conversation", json!({ "content": "rust worker pools are fun" })),
    )
    .await;
    assert!(stored.is_success());
    let id = stored.result.unwrap()["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 16);

    let found = dispatch(&state, request("search_conversations", json!({ "query": "worker pools" }))).await;
    assert!(found.is_success());
    let results = found.result.unwrap()["results"].as_array().unwrap().clone();
    assert!(!results.is_empty());
    assert_eq!(results[0]["item"]["id"], id);
}

#[tokio::test]
async fn store_reflection_does_not_need_a_conversation() {
    let state = test_state().await;
    let response = dispatch(
        &state,
        request("store_reflection", json!({ "content": "a standalone note", "tags": ["rust"] })),
    )
    .await;
    assert!(response.is_success());
    let id = response.result.unwrap()["id"].as_str().unwrap().to_string();

    let fetched = dispatch(&state, request("get_reflection_by_id", json!({ "id": id }))).await;
    assert!(fetched.is_success());
    assert_eq!(fetched.result.unwrap()["reflection"]["content"], "a standalone note");
}

#[tokio::test]
async fn insight_usage_and_statistics_round_trip() {
    let state = test_state().await;

    let stored = dispatch(
        &state,
        request(
            "store_insight",
            json!({
                "content": "prefer pipeline() over parallel()",
                "insight_type": "pattern",
                "confidence_score": 0.9,
                "quality_score": 0.8,
            }),
        ),
    )
    .await;
    let id = stored.result.unwrap()["id"].as_str().unwrap().to_string();

    let updated = dispatch(&state, request("update_insight_usage", json!({ "id": id }))).await;
    assert!(updated.is_success());
    assert_eq!(updated.result.unwrap()["updated"], true);

    let stats = dispatch(&state, request("get_insights_statistics", json!({}))).await;
    let stats = stats.result.unwrap();
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["avg_usage"], 1.0);
}

#[tokio::test]
async fn update_insight_usage_reports_false_for_unknown_id() {
    let state = test_state().await;
    let response = dispatch(&state, request("update_insight_usage", json!({ "id": "nope" }))).await;
    assert!(response.is_success());
    assert_eq!(response.result.unwrap()["updated"], false);
}

#[tokio::test]
async fn find_duplicates_and_deduplicate_round_trip() {
    let state = test_state().await;
    dispatch(
        &state,
        request(
            "store_conversation",
            json!({ "content": "the quick brown fox jumps over the lazy dog" }),
        ),
    )
    .await;
    dispatch(
        &state,
        request(
            "store_conversation",
            json!({ "content": "the quick brown fox jumps over the lazy dog!" }),
        ),
    )
    .await;

    let dupes = dispatch(
        &state,
        request(
            "find_duplicates",
            json!({ "content_type": "conversation", "content": "the quick brown fox jumps over the lazy dog", "threshold": 0.5 }),
        ),
    )
    .await;
    assert!(dupes.is_success());
    assert!(!dupes.result.unwrap()["duplicates"].as_array().unwrap().is_empty());

    let report = dispatch(
        &state,
        request("deduplicate", json!({ "content_type": "conversation", "threshold": 0.8, "dry_run": true })),
    )
    .await;
    assert!(report.is_success());
    assert_eq!(report.result.unwrap()["rows_removed"], 1);
}

#[tokio::test]
async fn execute_task_uses_the_default_pool() {
    let state = test_state().await;
    let response = dispatch(&state, request("execute_task", json!({ "prompt": "hello" }))).await;
    assert!(response.is_success());
    assert_eq!(response.result.unwrap()["echo"], "hello");
}

#[tokio::test]
async fn execute_batch_preserves_order_and_length() {
    let state = test_state().await;
    let response = dispatch(
        &state,
        request("execute_batch", json!({ "prompts": ["a", "b", "c"] })),
    )
    .await;
    assert!(response.is_success());
    let results = response.result.unwrap()["results"].as_array().unwrap().clone();
    assert_eq!(results.len(), 3);
    assert_eq!(results[1]["ok"]["echo"], "b");
}

#[tokio::test]
async fn unknown_tool_is_a_validation_error() {
    let state = test_state().await;
    let response = dispatch(&state, request("levitate", json!({}))).await;
    assert!(!response.is_success());
    assert_eq!(response.error.unwrap().kind, sb_protocol::ErrorKind::Validation);
}

#[tokio::test]
async fn health_reports_store_and_pool_state() {
    let state = test_state().await;
    let response = dispatch(&state, request("health", json!({}))).await;
    assert!(response.is_success());
    let result = response.result.unwrap();
    assert_eq!(result["store_healthy"], true);
    assert!(result["pools"].as_array().unwrap().iter().any(|p| p["pool_id"] == "default"));
}

#[tokio::test]
async fn evolve_category_then_assign_subcategory_finds_a_home() {
    let state = test_state().await;

    let memories: Vec<serde_json::Value> = vec![
        json!({ "id": "a1", "content": "rust async worker pool design", "embedding": [1.0, 0.0, 0.0] }),
        json!({ "id": "a2", "content": "rust async worker scheduling", "embedding": [0.9, 0.1, 0.0] }),
        json!({ "id": "a3", "content": "rust async worker shutdown", "embedding": [0.95, 0.0, 0.05] }),
        json!({ "id": "a4", "content": "rust async worker queue depth", "embedding": [0.9, 0.05, 0.05] }),
        json!({ "id": "a5", "content": "rust async worker health checks", "embedding": [1.0, 0.05, 0.0] }),
        json!({ "id": "b1", "content": "favorite pasta recipe tonight", "embedding": [0.0, 0.0, 1.0] }),
        json!({ "id": "b2", "content": "favorite pasta sauce recipe", "embedding": [0.0, 0.1, 0.9] }),
        json!({ "id": "b3", "content": "favorite pasta dough recipe", "embedding": [0.05, 0.0, 0.95] }),
        json!({ "id": "b4", "content": "favorite pasta dinner tonight", "embedding": [0.0, 0.05, 1.0] }),
        json!({ "id": "b5", "content": "favorite pasta night recipe", "embedding": [0.05, 0.05, 0.9] }),
    ];

    let evolved = dispatch(
        &state,
        request("evolve_category", json!({ "category": "context", "memories": memories })),
    )
    .await;
    assert!(evolved.is_success());

    let assigned = dispatch(
        &state,
        request(
            "assign_subcategory",
            json!({
                "id": "probe",
                "content": "rust async worker design notes",
                "category": "context",
                "embedding": [0.95, 0.05, 0.0],
            }),
        ),
    )
    .await;
    assert!(assigned.is_success());
    assert_eq!(assigned.result.unwrap()["category"], "context");
}
