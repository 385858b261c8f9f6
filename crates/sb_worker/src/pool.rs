//! A fixed-size pool of workers sharing one task queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::info;

use crate::error::{Result, WorkerError};
use crate::task::{Task, TaskExecutor, TaskOutcome};
use crate::worker::{Job, Worker, WorkerHealth};

/// Every pool runs exactly this many workers. Matches the original
/// scheduler's fixed sizing -- pools trade elasticity for predictable
/// resource usage.
pub const WORKERS_PER_POOL: usize = 3;

#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolHealth {
    pub pool_id: String,
    pub status: String,
    pub workers_healthy: usize,
    pub workers_total: usize,
    pub worker_health: Vec<WorkerHealth>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStatus {
    pub pool_id: String,
    pub running: bool,
    pub queue_depth: usize,
    pub workers_total: usize,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

/// A fixed pool of [`WORKERS_PER_POOL`] workers draining one shared
/// FIFO task queue.
pub struct WorkerPool {
    pool_id: String,
    sender: mpsc::UnboundedSender<Job>,
    workers: Mutex<Vec<Worker>>,
    running: std::sync::atomic::AtomicBool,
    created_at: DateTime<Utc>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    next_task_seq: AtomicU64,
}

impl WorkerPool {
    /// Create and start a pool of [`WORKERS_PER_POOL`] workers, all
    /// sharing `executor`.
    pub async fn start(pool_id: impl Into<String>, executor: Arc<dyn TaskExecutor>) -> Arc<Self> {
        let pool_id = pool_id.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(WORKERS_PER_POOL);
        for i in 0..WORKERS_PER_POOL {
            let worker_id = format!("{pool_id}-worker-{i}");
            workers.push(Worker::spawn(worker_id, executor.clone(), receiver.clone()));
        }

        info!(pool_id = %pool_id, workers = WORKERS_PER_POOL, "pool started");

        Arc::new(Self {
            pool_id,
            sender,
            workers: Mutex::new(workers),
            running: std::sync::atomic::AtomicBool::new(true),
            created_at: Utc::now(),
            started_at: Mutex::new(Some(Utc::now())),
            tasks_submitted: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            next_task_seq: AtomicU64::new(0),
        })
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    /// Approximate number of tasks waiting to be picked up. `mpsc`
    /// doesn't expose a true queue length, so we track submissions minus
    /// completions minus failures as a close approximation.
    pub fn queue_depth(&self) -> usize {
        let submitted = self.tasks_submitted.load(Ordering::SeqCst);
        let done = self.tasks_completed.load(Ordering::SeqCst) + self.tasks_failed.load(Ordering::SeqCst);
        submitted.saturating_sub(done) as usize
    }

    /// Submit one task and await its result, or time out.
    pub async fn execute(&self, prompt: &str, context: Value, timeout: Duration) -> Result<Value> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(WorkerError::PoolShuttingDown);
        }

        let seq = self.next_task_seq.fetch_add(1, Ordering::SeqCst);
        let task_id = format!("{}-task-{}", self.pool_id, seq);
        let task = Task::new(task_id, prompt, context);

        let (resp_tx, resp_rx) = oneshot::channel();
        self.tasks_submitted.fetch_add(1, Ordering::SeqCst);
        self.sender
            .send((task, resp_tx))
            .map_err(|_| WorkerError::PoolShuttingDown)?;

        let outcome = match tokio::time::timeout(timeout, resp_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err("worker dropped without responding".to_string()),
            Err(_) => {
                self.tasks_failed.fetch_add(1, Ordering::SeqCst);
                return Err(WorkerError::Timeout(timeout));
            }
        };

        match outcome {
            Ok(value) => {
                self.tasks_completed.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }
            Err(msg) => {
                self.tasks_failed.fetch_add(1, Ordering::SeqCst);
                Err(WorkerError::TaskFailed(msg))
            }
        }
    }

    /// Submit every prompt concurrently, preserving each task's own
    /// outcome (success or failure) in place rather than aborting the
    /// whole batch on the first error.
    pub async fn execute_batch(
        &self,
        prompts: &[String],
        context: Value,
        timeout: Duration,
    ) -> Vec<Result<Value>> {
        let futures = prompts
            .iter()
            .map(|p| self.execute(p, context.clone(), timeout));
        futures::future::join_all(futures).await
    }

    pub async fn health_check(&self) -> PoolHealth {
        let workers = self.workers.lock().await;
        let mut worker_health = Vec::with_capacity(workers.len());
        for w in workers.iter() {
            worker_health.push(w.health().await);
        }
        let workers_healthy = worker_health.iter().filter(|h| h.healthy).count();
        let status = if !self.running.load(Ordering::SeqCst) {
            "not_running"
        } else if workers_healthy == worker_health.len() {
            "healthy"
        } else {
            "degraded"
        };

        PoolHealth {
            pool_id: self.pool_id.clone(),
            status: status.to_string(),
            workers_healthy,
            workers_total: worker_health.len(),
            worker_health,
        }
    }

    pub async fn get_status(&self) -> PoolStatus {
        let submitted = self.tasks_submitted.load(Ordering::SeqCst);
        let completed = self.tasks_completed.load(Ordering::SeqCst);
        let failed = self.tasks_failed.load(Ordering::SeqCst);
        let success_rate = if submitted == 0 {
            1.0
        } else {
            completed as f64 / (completed + failed).max(1) as f64
        };

        PoolStatus {
            pool_id: self.pool_id.clone(),
            running: self.running.load(Ordering::SeqCst),
            queue_depth: self.queue_depth(),
            workers_total: self.workers.lock().await.len(),
            tasks_submitted: submitted,
            tasks_completed: completed,
            tasks_failed: failed,
            success_rate,
            created_at: self.created_at,
            started_at: *self.started_at.lock().await,
        }
    }

    /// Stop accepting new work and wait (up to `timeout`) for every
    /// worker to drain its current job and exit.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        let mut workers = self.workers.lock().await;
        let shutdowns = workers.iter_mut().map(|w| w.shutdown());
        let _ = tokio::time::timeout(timeout, futures::future::join_all(shutdowns)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::EchoExecutor;

    #[tokio::test]
    async fn starts_exactly_three_workers() {
        let pool = WorkerPool::start("p1", Arc::new(EchoExecutor)).await;
        let status = pool.get_status().await;
        assert_eq!(status.workers_total, WORKERS_PER_POOL);
    }

    #[tokio::test]
    async fn execute_returns_result_and_updates_counters() {
        let pool = WorkerPool::start("p1", Arc::new(EchoExecutor)).await;
        let result = pool
            .execute("hello", serde_json::json!({}), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result["echo"], "hello");

        let status = pool.get_status().await;
        assert_eq!(status.tasks_submitted, 1);
        assert_eq!(status.tasks_completed, 1);
        assert_eq!(status.success_rate, 1.0);
    }

    #[tokio::test]
    async fn success_rate_is_one_with_no_submissions() {
        let pool = WorkerPool::start("p1", Arc::new(EchoExecutor)).await;
        assert_eq!(pool.get_status().await.success_rate, 1.0);
    }

    #[tokio::test]
    async fn execute_batch_preserves_per_task_outcomes() {
        let pool = WorkerPool::start("p1", Arc::new(EchoExecutor)).await;
        let prompts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = pool
            .execute_batch(&prompts, serde_json::json!({}), Duration::from_secs(1))
            .await;
        assert_eq!(results.len(), 3);
        for r in results {
            assert!(r.is_ok());
        }
    }

    #[tokio::test]
    async fn health_check_reports_healthy_fresh_pool() {
        let pool = WorkerPool::start("p1", Arc::new(EchoExecutor)).await;
        let health = pool.health_check().await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.workers_healthy, WORKERS_PER_POOL);
    }

    #[tokio::test]
    async fn shutdown_stops_accepting_new_work() {
        let pool = WorkerPool::start("p1", Arc::new(EchoExecutor)).await;
        pool.shutdown(Duration::from_secs(1)).await.unwrap();
        let err = pool
            .execute("x", serde_json::json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::PoolShuttingDown));
    }
}
