//! Wires the collaborator crates into the shared state every handler
//! operates on: one memory store, the process-wide pool manager, a
//! hybrid sync orchestrator, and the process-wide evolution engine.

use std::sync::Arc;
use std::time::Duration;

use sb_evolution::{get_evolution_engine, CategoryEvolutionEngine, EvolutionConfig};
use sb_protocol::config::{ForceMethod, SessionBuddyConfig};
use sb_store::{MemoryStore, StoreConfig};
use sb_sync::{CloudSyncMethod, HttpSyncMethod, HybridSync, RetryPolicy, SyncMethod};
use sb_worker::{get_pool_manager, EchoExecutor, PoolManager};

use crate::config::store_config;

pub const DEFAULT_POOL_ID: &str = "default";

pub struct AppState {
    pub config: SessionBuddyConfig,
    pub store: MemoryStore,
    pub pools: Arc<PoolManager>,
    pub sync: HybridSync,
    pub evolution: Arc<CategoryEvolutionEngine>,
    pub evolution_config: EvolutionConfig,
}

impl AppState {
    pub async fn new(config: SessionBuddyConfig) -> anyhow::Result<Self> {
        if config.akosha_force_method == ForceMethod::Cloud && !config.cloud_configured() {
            anyhow::bail!("akosha_force_method=cloud requires akosha_cloud_bucket to be set");
        }

        let store = MemoryStore::open(&store_config(&config)).await?;

        let pools = get_pool_manager().await;
        if pools.get_pool(DEFAULT_POOL_ID).await.is_err() {
            pools.create_pool(DEFAULT_POOL_ID, Arc::new(EchoExecutor)).await?;
        }

        let sync = build_hybrid_sync(&config)?;
        let evolution = get_evolution_engine();

        Ok(Self {
            config,
            store,
            pools,
            sync,
            evolution,
            evolution_config: EvolutionConfig::default(),
        })
    }
}

fn build_hybrid_sync(config: &SessionBuddyConfig) -> anyhow::Result<HybridSync> {
    let mut methods: Vec<Box<dyn SyncMethod>> = Vec::new();
    if config.cloud_configured() {
        let bucket = config.akosha_cloud_bucket.clone().unwrap();
        let endpoint = config
            .akosha_cloud_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));
        methods.push(Box::new(CloudSyncMethod::try_new(
            bucket,
            endpoint,
            config.akosha_enable_compression,
            config.akosha_enable_deduplication,
        )?));
    }
    if config.should_use_http() {
        methods.push(Box::new(HttpSyncMethod::new()));
    }

    let policy = RetryPolicy {
        max_retries: config.akosha_max_retries,
        backoff: Duration::from_secs(config.akosha_retry_backoff_seconds),
    };
    Ok(HybridSync::new(methods).with_policy(policy))
}
