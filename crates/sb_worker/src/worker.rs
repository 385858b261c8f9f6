//! A single pool worker: a loop that pulls tasks off the shared queue,
//! runs them through a [`TaskExecutor`], and tracks its own health.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{error, warn};

use crate::task::{Task, TaskExecutor, TaskOutcome};

/// Consecutive task failures after which a worker reports unhealthy.
pub const UNHEALTHY_FAILURE_THRESHOLD: u32 = 3;

/// Idle time after which a worker reports unhealthy even with no failures.
pub const UNHEALTHY_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub(crate) type Job = (Task, oneshot::Sender<TaskOutcome>);

/// A worker's point-in-time health.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkerHealth {
    pub worker_id: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub idle_seconds: u64,
}

/// A pool worker. Runs its receive loop on a spawned task; [`Worker`]
/// itself is a handle used to query health and request a stop.
pub struct Worker {
    id: String,
    consecutive_failures: Arc<AtomicU32>,
    last_activity: Arc<Mutex<Instant>>,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Worker {
    /// Spawn a worker that pulls jobs from `queue` until stopped or the
    /// queue closes.
    pub fn spawn(
        id: impl Into<String>,
        executor: Arc<dyn TaskExecutor>,
        queue: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    ) -> Self {
        let id = id.into();
        let consecutive_failures = Arc::new(AtomicU32::new(0));
        let last_activity = Arc::new(Mutex::new(Instant::now()));
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let worker_id = id.clone();
        let failures = consecutive_failures.clone();
        let activity = last_activity.clone();

        let handle = tokio::spawn(async move {
            loop {
                let job = {
                    let mut rx = queue.lock().await;
                    tokio::select! {
                        job = rx.recv() => job,
                        _ = &mut stop_rx => None,
                    }
                };

                let Some((task, responder)) = job else {
                    break;
                };

                let outcome = executor.execute(&task).await;
                *activity.lock().await = Instant::now();

                match &outcome {
                    Ok(_) => {
                        failures.store(0, Ordering::SeqCst);
                    }
                    Err(msg) => {
                        let n = failures.fetch_add(1, Ordering::SeqCst) + 1;
                        warn!(worker_id, task_id = %task.id, error = %msg, failures = n, "task failed");
                    }
                }

                if responder.send(outcome).is_err() {
                    error!(worker_id, task_id = %task.id, "caller dropped result receiver");
                }
            }
        });

        Self {
            id,
            consecutive_failures,
            last_activity,
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn health(&self) -> WorkerHealth {
        let idle = self.last_activity.lock().await.elapsed();
        let failures = self.consecutive_failures.load(Ordering::SeqCst);
        WorkerHealth {
            worker_id: self.id.clone(),
            healthy: failures < UNHEALTHY_FAILURE_THRESHOLD && idle < UNHEALTHY_IDLE_TIMEOUT,
            consecutive_failures: failures,
            idle_seconds: idle.as_secs(),
        }
    }

    /// Signal the worker to stop and wait for its loop to exit.
    pub async fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::EchoExecutor;

    #[tokio::test]
    async fn fresh_worker_is_healthy() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn("w-1", Arc::new(EchoExecutor), Arc::new(Mutex::new(rx)));
        let health = worker.health().await;
        assert!(health.healthy);
        assert_eq!(health.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn executes_submitted_task() {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let worker = Worker::spawn("w-1", Arc::new(EchoExecutor), Arc::new(Mutex::new(rx)));

        let (resp_tx, resp_rx) = oneshot::channel();
        let task = Task::new("w-1-task-0", "hello", serde_json::json!({}));
        tx.send((task, resp_tx)).unwrap();

        let outcome = resp_rx.await.unwrap();
        assert_eq!(outcome.unwrap()["echo"], "hello");

        let mut worker = worker;
        worker.shutdown().await;
    }
}
