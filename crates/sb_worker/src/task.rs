//! Units of work a [`crate::pool::WorkerPool`] schedules onto its workers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A unit of work submitted to a pool. `prompt`/`context` are opaque to
/// the pool itself -- what they mean is up to whatever [`TaskExecutor`]
/// the pool's workers hold.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub prompt: String,
    pub context: Value,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, context: Value) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            context,
            created_at: Utc::now(),
        }
    }
}

/// Result of executing a task: either a value or a human-readable error,
/// mirroring the task-level exceptions the original scheduler preserved
/// in place when batching (a single failing task does not abort the batch).
pub type TaskOutcome = Result<Value, String>;

/// The actual work a worker performs for a task. Invoking an LLM, a
/// tool, or any other provider is outside this crate's scope; the pool
/// only needs something that can turn a task into an outcome.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> TaskOutcome;
}

/// An executor that always succeeds, echoing the prompt back as the
/// result. Useful for wiring up pools before a real executor exists and
/// for tests that only care about scheduling behavior.
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(&self, task: &Task) -> TaskOutcome {
        Ok(serde_json::json!({ "echo": task.prompt }))
    }
}
