//! Named pools, routing between them, and aggregate health reporting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Result, WorkerError};
use crate::pool::{PoolHealth, WorkerPool};
use crate::task::TaskExecutor;

/// How [`PoolManager::route_task`] picks among registered pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// The pool with the shortest queue.
    LeastLoaded,
    /// The first pool registered (stable, deterministic).
    RoundRobin,
    /// A uniformly random pool.
    Random,
}

impl std::str::FromStr for RoutingStrategy {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "least_loaded" => Ok(Self::LeastLoaded),
            "round_robin" => Ok(Self::RoundRobin),
            "random" => Ok(Self::Random),
            other => Err(WorkerError::UnknownRoutingStrategy(other.to_string())),
        }
    }
}

/// Owns every named pool in the process and routes work across them.
pub struct PoolManager {
    pools: Mutex<HashMap<String, Arc<WorkerPool>>>,
}

impl PoolManager {
    pub fn new() -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_pool(
        &self,
        pool_id: impl Into<String>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Arc<WorkerPool>> {
        let pool_id = pool_id.into();
        let mut pools = self.pools.lock().await;
        if pools.contains_key(&pool_id) {
            return Err(WorkerError::PoolAlreadyExists(pool_id));
        }
        let pool = WorkerPool::start(pool_id.clone(), executor).await;
        pools.insert(pool_id, pool.clone());
        Ok(pool)
    }

    pub async fn get_pool(&self, pool_id: &str) -> Result<Arc<WorkerPool>> {
        self.pools
            .lock()
            .await
            .get(pool_id)
            .cloned()
            .ok_or_else(|| WorkerError::PoolNotFound(pool_id.to_string()))
    }

    pub async fn delete_pool(&self, pool_id: &str, shutdown_timeout: Duration) -> Result<()> {
        let pool = {
            let mut pools = self.pools.lock().await;
            pools
                .remove(pool_id)
                .ok_or_else(|| WorkerError::PoolNotFound(pool_id.to_string()))?
        };
        pool.shutdown(shutdown_timeout).await
    }

    pub async fn list_pools(&self) -> Vec<String> {
        self.pools.lock().await.keys().cloned().collect()
    }

    pub async fn execute_on_pool(
        &self,
        pool_id: &str,
        prompt: &str,
        context: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let pool = self.get_pool(pool_id).await?;
        pool.execute(prompt, context, timeout).await
    }

    /// Pick a pool per `strategy`, submit `prompt` to it, and return
    /// which pool id was chosen alongside the outcome.
    pub async fn route_task(
        &self,
        prompt: &str,
        context: Value,
        strategy: RoutingStrategy,
        timeout: Duration,
    ) -> Result<(String, Value)> {
        let pools = self.pools.lock().await;
        if pools.is_empty() {
            return Err(WorkerError::NoPoolsAvailable);
        }

        let chosen = match strategy {
            RoutingStrategy::RoundRobin => {
                let mut ids: Vec<&String> = pools.keys().collect();
                ids.sort();
                pools.get(ids[0]).unwrap().clone()
            }
            RoutingStrategy::Random => {
                let values: Vec<&Arc<WorkerPool>> = pools.values().collect();
                (*values.choose(&mut rand::thread_rng()).unwrap()).clone()
            }
            RoutingStrategy::LeastLoaded => {
                pools
                    .values()
                    .min_by_key(|p| p.queue_depth())
                    .unwrap()
                    .clone()
            }
        };
        drop(pools);

        let pool_id = chosen.pool_id().to_string();
        let result = chosen.execute(prompt, context, timeout).await?;
        Ok((pool_id, result))
    }

    pub async fn get_health_status(&self) -> Vec<PoolHealth> {
        let pools: Vec<Arc<WorkerPool>> = self.pools.lock().await.values().cloned().collect();
        let mut out = Vec::with_capacity(pools.len());
        for pool in pools {
            out.push(pool.health_check().await);
        }
        out
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::EchoExecutor;

    #[tokio::test]
    async fn create_and_get_pool_round_trips() {
        let manager = PoolManager::new();
        manager.create_pool("p1", Arc::new(EchoExecutor)).await.unwrap();
        assert!(manager.get_pool("p1").await.is_ok());
    }

    #[tokio::test]
    async fn create_pool_rejects_duplicate_id() {
        let manager = PoolManager::new();
        manager.create_pool("p1", Arc::new(EchoExecutor)).await.unwrap();
        let err = manager.create_pool("p1", Arc::new(EchoExecutor)).await.unwrap_err();
        assert!(matches!(err, WorkerError::PoolAlreadyExists(_)));
    }

    #[tokio::test]
    async fn route_task_fails_with_no_pools() {
        let manager = PoolManager::new();
        let err = manager
            .route_task("x", serde_json::json!({}), RoutingStrategy::LeastLoaded, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NoPoolsAvailable));
    }

    #[tokio::test]
    async fn route_task_least_loaded_reaches_a_pool() {
        let manager = PoolManager::new();
        manager.create_pool("p1", Arc::new(EchoExecutor)).await.unwrap();
        manager.create_pool("p2", Arc::new(EchoExecutor)).await.unwrap();
        let (pool_id, result) = manager
            .route_task("hi", serde_json::json!({}), RoutingStrategy::LeastLoaded, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(pool_id == "p1" || pool_id == "p2");
        assert_eq!(result["echo"], "hi");
    }

    #[tokio::test]
    async fn unknown_strategy_string_is_rejected() {
        use std::str::FromStr;
        assert!(RoutingStrategy::from_str("banana").is_err());
    }

    #[tokio::test]
    async fn delete_pool_removes_it() {
        let manager = PoolManager::new();
        manager.create_pool("p1", Arc::new(EchoExecutor)).await.unwrap();
        manager.delete_pool("p1", Duration::from_secs(1)).await.unwrap();
        assert!(manager.get_pool("p1").await.is_err());
    }
}
