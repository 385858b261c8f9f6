//! Process-wide lazily-initialized [`CategoryEvolutionEngine`], mirroring
//! `sb_worker::global::get_pool_manager`.

use std::sync::{Arc, OnceLock};

use crate::engine::CategoryEvolutionEngine;

static GLOBAL_ENGINE: OnceLock<Arc<CategoryEvolutionEngine>> = OnceLock::new();

/// Get, or create on first call, the process-wide
/// [`CategoryEvolutionEngine`].
pub fn get_evolution_engine() -> Arc<CategoryEvolutionEngine> {
    GLOBAL_ENGINE
        .get_or_init(|| Arc::new(CategoryEvolutionEngine::new()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_same_instance_across_calls() {
        let a = get_evolution_engine();
        let b = get_evolution_engine();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
