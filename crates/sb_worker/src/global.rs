//! Process-wide lazily-initialized [`PoolManager`] singleton, for callers
//! that want one shared manager without threading it through every
//! layer by hand.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::manager::PoolManager;

static GLOBAL_POOL_MANAGER: OnceCell<Arc<PoolManager>> = OnceCell::const_new();

/// Get, or create on first call, the process-wide [`PoolManager`].
pub async fn get_pool_manager() -> Arc<PoolManager> {
    GLOBAL_POOL_MANAGER
        .get_or_init(|| async { Arc::new(PoolManager::new()) })
        .await
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_the_same_instance_across_calls() {
        let a = get_pool_manager().await;
        let b = get_pool_manager().await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
