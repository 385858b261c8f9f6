//! Priority-ordered orchestration across multiple [`SyncMethod`]s, with
//! per-method exponential-backoff retries and full failure accumulation.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{MethodFailure, Result, SyncError};
use crate::protocol::{SyncMethod, SyncOutcome};

/// Retry/backoff policy shared by every method in the chain.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `i` (0-indexed): `backoff * 2^i`.
    pub fn delay_for_attempt(&self, i: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(i)
    }
}

/// Tries each registered method in priority order (`[cloud, http]` by
/// convention), retrying each with exponential backoff before moving to
/// the next. Succeeds on the first method that succeeds; fails only if
/// every method in the chain fails every retry.
pub struct HybridSync {
    methods: Vec<Box<dyn SyncMethod>>,
    policy: RetryPolicy,
}

impl HybridSync {
    pub fn new(methods: Vec<Box<dyn SyncMethod>>) -> Self {
        Self {
            methods,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `force_method` of `"auto"` (or `None`) walks the priority chain as
    /// `sync` does; any other name pins the orchestrator to that single
    /// method, failing with a single-entry [`SyncError::Hybrid`] if it
    /// isn't configured.
    pub async fn sync_memories(
        &self,
        force_method: Option<&str>,
        system_id: &str,
        files: &[&Path],
    ) -> Result<SyncOutcome> {
        match force_method {
            None | Some("auto") => self.sync(system_id, files).await,
            Some(name) => {
                let method = self
                    .methods
                    .iter()
                    .find(|m| m.get_method_name() == name)
                    .ok_or_else(|| SyncError::Hybrid {
                        errors: vec![MethodFailure {
                            method: name.to_string(),
                            error: "method not configured".to_string(),
                        }],
                    })?;
                self.sync_with_retries(method.as_ref(), system_id, files)
                    .await
                    .map_err(|e| SyncError::Hybrid {
                        errors: vec![MethodFailure { method: name.to_string(), error: e.to_string() }],
                    })
            }
        }
    }

    pub async fn sync(&self, system_id: &str, files: &[&Path]) -> Result<SyncOutcome> {
        let mut failures = Vec::new();

        for method in &self.methods {
            if !method.is_available().await {
                failures.push(MethodFailure {
                    method: method.get_method_name().to_string(),
                    error: "unavailable".to_string(),
                });
                continue;
            }

            match self.sync_with_retries(method.as_ref(), system_id, files).await {
                Ok(outcome) => {
                    info!(method = method.get_method_name(), "sync succeeded");
                    return Ok(outcome);
                }
                Err(err) => {
                    warn!(method = method.get_method_name(), error = %err, "sync method exhausted retries");
                    failures.push(MethodFailure {
                        method: method.get_method_name().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        Err(SyncError::Hybrid { errors: failures })
    }

    async fn sync_with_retries(
        &self,
        method: &dyn SyncMethod,
        system_id: &str,
        files: &[&Path],
    ) -> Result<SyncOutcome> {
        let mut last_err = None;
        for attempt in 0..self.policy.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.policy.delay_for_attempt(attempt - 1)).await;
            }
            match method.sync(system_id, files).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    warn!(
                        method = method.get_method_name(),
                        attempt, error = %e, "sync attempt failed"
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.expect("loop runs at least once"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyMethod {
        name: &'static str,
        available: bool,
        fail_times: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SyncMethod for FlakyMethod {
        async fn sync(&self, system_id: &str, _files: &[&Path]) -> Result<SyncOutcome> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(SyncError::CloudUpload("simulated failure".to_string()));
            }
            Ok(SyncOutcome {
                method: self.name.to_string(),
                manifest: crate::manifest::UploadManifest {
                    upload_id: "u1".to_string(),
                    system_id: system_id.to_string(),
                    timestamp: chrono::Utc::now(),
                    files: vec![],
                    metadata: Default::default(),
                },
            })
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        fn get_method_name(&self) -> &str {
            self.name
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_available_method() {
        let methods: Vec<Box<dyn SyncMethod>> = vec![Box::new(FlakyMethod {
            name: "cloud",
            available: true,
            fail_times: Arc::new(AtomicU32::new(0)),
        })];
        let sync = HybridSync::new(methods).with_policy(fast_policy());
        let outcome = sync.sync("sys-a", &[]).await.unwrap();
        assert_eq!(outcome.method, "cloud");
    }

    #[tokio::test]
    async fn falls_through_to_next_method_when_first_unavailable() {
        let methods: Vec<Box<dyn SyncMethod>> = vec![
            Box::new(FlakyMethod {
                name: "cloud",
                available: false,
                fail_times: Arc::new(AtomicU32::new(0)),
            }),
            Box::new(FlakyMethod {
                name: "http",
                available: true,
                fail_times: Arc::new(AtomicU32::new(0)),
            }),
        ];
        let sync = HybridSync::new(methods).with_policy(fast_policy());
        let outcome = sync.sync("sys-a", &[]).await.unwrap();
        assert_eq!(outcome.method, "http");
    }

    #[tokio::test]
    async fn retries_before_giving_up_on_a_method() {
        let methods: Vec<Box<dyn SyncMethod>> = vec![Box::new(FlakyMethod {
            name: "cloud",
            available: true,
            fail_times: Arc::new(AtomicU32::new(1)),
        })];
        let sync = HybridSync::new(methods).with_policy(fast_policy());
        let outcome = sync.sync("sys-a", &[]).await.unwrap();
        assert_eq!(outcome.method, "cloud");
    }

    #[tokio::test]
    async fn reports_every_method_failure_when_all_exhausted() {
        let methods: Vec<Box<dyn SyncMethod>> = vec![
            Box::new(FlakyMethod {
                name: "cloud",
                available: true,
                fail_times: Arc::new(AtomicU32::new(100)),
            }),
            Box::new(FlakyMethod {
                name: "http",
                available: true,
                fail_times: Arc::new(AtomicU32::new(100)),
            }),
        ];
        let sync = HybridSync::new(methods).with_policy(fast_policy());
        let err = sync.sync("sys-a", &[]).await.unwrap_err();
        match err {
            SyncError::Hybrid { errors } => assert_eq!(errors.len(), 2),
            _ => panic!("expected Hybrid error"),
        }
    }

    #[tokio::test]
    async fn force_method_pins_the_named_method() {
        let methods: Vec<Box<dyn SyncMethod>> = vec![
            Box::new(FlakyMethod { name: "cloud", available: true, fail_times: Arc::new(AtomicU32::new(0)) }),
            Box::new(FlakyMethod { name: "http", available: true, fail_times: Arc::new(AtomicU32::new(0)) }),
        ];
        let sync = HybridSync::new(methods).with_policy(fast_policy());
        let outcome = sync.sync_memories(Some("http"), "sys-a", &[]).await.unwrap();
        assert_eq!(outcome.method, "http");
    }

    #[tokio::test]
    async fn force_method_rejects_unconfigured_name() {
        let methods: Vec<Box<dyn SyncMethod>> = vec![Box::new(FlakyMethod {
            name: "cloud",
            available: true,
            fail_times: Arc::new(AtomicU32::new(0)),
        })];
        let sync = HybridSync::new(methods).with_policy(fast_policy());
        let err = sync.sync_memories(Some("carrier-pigeon"), "sys-a", &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::Hybrid { .. }));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    }
}
