//! Scenario registry: multi-store aggregation with a warm concurrent cache.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

use cadenza_core::scenario::ScenarioStore;
use cadenza_core::types::ScenarioPrompt;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("scenario not found: {0}")]
    NotFound(String),
}

/// Aggregates an ordered list of scenario stores behind a case-insensitive
/// cache.
///
/// Construction kicks off an asynchronous warm-up loading every store;
/// lookups await it, and concurrent initializers coalesce. Cache writes are
/// last-writer-wins, with store order fixing precedence on a tie.
pub struct ScenarioRegistry {
    stores: Vec<Arc<dyn ScenarioStore>>,
    cache: RwLock<HashMap<String, Arc<ScenarioPrompt>>>,
    warmup: OnceCell<()>,
}

impl ScenarioRegistry {
    /// Create a registry and kick off its warm-up.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(stores: Vec<Arc<dyn ScenarioStore>>) -> Arc<Self> {
        let registry = Arc::new(Self {
            stores,
            cache: RwLock::new(HashMap::new()),
            warmup: OnceCell::new(),
        });
        let warming = Arc::clone(&registry);
        tokio::spawn(async move {
            warming.ensure_warm().await;
        });
        registry
    }

    async fn ensure_warm(&self) {
        self.warmup.get_or_init(|| self.warm_up()).await;
    }

    async fn warm_up(&self) {
        let loads = join_all(self.stores.iter().map(|store| store.get_all_scenarios())).await;

        let mut cache = self.cache.write().await;
        for (store_index, outcome) in loads.into_iter().enumerate() {
            match outcome {
                Ok(scenarios) => {
                    info!(
                        store_index,
                        scenario_count = scenarios.len(),
                        "scenario store loaded"
                    );
                    for scenario in scenarios {
                        cache.insert(scenario.name.to_lowercase(), Arc::new(scenario));
                    }
                }
                Err(e) => {
                    warn!(store_index, error = %e, "scenario store failed to load");
                }
            }
        }
        info!(cached = cache.len(), "scenario registry warm-up complete");
    }

    /// Look up a scenario by name (case-insensitive).
    ///
    /// A cache miss fans out across every store in parallel and caches each
    /// hit under its own name before deciding.
    pub async fn get_scenario(&self, name: &str) -> Result<Arc<ScenarioPrompt>, RegistryError> {
        self.ensure_warm().await;
        let key = name.to_lowercase();

        {
            let cache = self.cache.read().await;
            if let Some(scenario) = cache.get(&key) {
                return Ok(Arc::clone(scenario));
            }
        }

        let lookups = join_all(self.stores.iter().map(|store| store.get_scenario(name))).await;
        {
            let mut cache = self.cache.write().await;
            for (store_index, outcome) in lookups.into_iter().enumerate() {
                match outcome {
                    Ok(Some(scenario)) => {
                        cache.insert(scenario.name.to_lowercase(), Arc::new(scenario));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(store_index, scenario = name, error = %e, "scenario store lookup failed");
                    }
                }
            }
        }

        let cache = self.cache.read().await;
        cache
            .get(&key)
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Cached scenario names, sorted
    pub async fn list_scenario_names(&self) -> Vec<String> {
        self.ensure_warm().await;
        let cache = self.cache.read().await;
        let mut names: Vec<String> = cache.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::types::{PromptTurn, RuntimeStage};
    use cadenza_stores::InMemoryScenarioStore;

    fn scenario(name: &str) -> ScenarioPrompt {
        ScenarioPrompt {
            name: name.to_string(),
            stages: vec![RuntimeStage {
                id: 1,
                name: "only".to_string(),
                turns: vec![PromptTurn::user("hi")],
                model: Some("m".to_string()),
                parameters: Default::default(),
            }],
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_world_warms_up_to_an_empty_cache() {
        let registry = ScenarioRegistry::new(vec![Arc::new(InMemoryScenarioStore::new())]);

        assert!(registry.list_scenario_names().await.is_empty());
        assert!(matches!(
            registry.get_scenario("echo").await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_warm_up_caches_scenarios_case_insensitively() {
        let store = Arc::new(InMemoryScenarioStore::new());
        store
            .store_scenario(scenario("Echo"))
            .await
            .expect("store");
        let registry = ScenarioRegistry::new(vec![store]);

        let found = registry.get_scenario("ECHO").await.expect("get");
        assert_eq!(found.name, "Echo");
        assert_eq!(registry.list_scenario_names().await, vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_later_stores_win_on_name_ties() {
        let first = Arc::new(InMemoryScenarioStore::new());
        let mut early = scenario("echo");
        early.metadata.insert("origin".to_string(), "first".to_string());
        first.store_scenario(early).await.expect("store");

        let second = Arc::new(InMemoryScenarioStore::new());
        let mut late = scenario("echo");
        late.metadata.insert("origin".to_string(), "second".to_string());
        second.store_scenario(late).await.expect("store");

        let registry = ScenarioRegistry::new(vec![first, second]);
        let found = registry.get_scenario("echo").await.expect("get");
        assert_eq!(found.metadata.get("origin"), Some(&"second".to_string()));
    }

    #[tokio::test]
    async fn test_cache_miss_fans_out_to_find_late_additions() {
        let store = Arc::new(InMemoryScenarioStore::new());
        let registry = ScenarioRegistry::new(vec![store.clone()]);

        // Warm-up sees an empty store.
        assert!(registry.list_scenario_names().await.is_empty());

        store
            .store_scenario(scenario("late"))
            .await
            .expect("store");
        let found = registry.get_scenario("late").await.expect("get");
        assert_eq!(found.name, "late");
    }
}
