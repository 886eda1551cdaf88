//! In-memory ScenarioStore implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use cadenza_core::scenario::{validate_runtime_scenario, ScenarioStore};
use cadenza_core::store::StoreError;
use cadenza_core::types::ScenarioPrompt;

/// In-memory implementation backing administrative flows and tests.
///
/// Names are case-insensitive; storing validates the runtime invariants
/// (one system turn at most, at least one user turn, non-empty schemas).
#[derive(Default)]
pub struct InMemoryScenarioStore {
    scenarios: RwLock<HashMap<String, ScenarioPrompt>>,
}

impl InMemoryScenarioStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScenarioStore for InMemoryScenarioStore {
    async fn get_scenario(&self, name: &str) -> Result<Option<ScenarioPrompt>, StoreError> {
        let scenarios = self
            .scenarios
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(scenarios.get(&name.to_lowercase()).cloned())
    }

    async fn get_all_scenarios(&self) -> Result<Vec<ScenarioPrompt>, StoreError> {
        let scenarios = self
            .scenarios
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(scenarios.values().cloned().collect())
    }

    async fn list_scenario_names(&self) -> Result<Vec<String>, StoreError> {
        let scenarios = self
            .scenarios
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut names: Vec<String> = scenarios.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn store_scenario(&self, scenario: ScenarioPrompt) -> Result<(), StoreError> {
        let issues = validate_runtime_scenario(&scenario);
        if !issues.is_empty() {
            let summary = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(StoreError::InvalidArgument(format!(
                "scenario '{}' is not well-formed: {}",
                scenario.name, summary
            )));
        }
        let mut scenarios = self
            .scenarios
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        scenarios.insert(scenario.name.to_lowercase(), scenario);
        Ok(())
    }

    async fn delete_scenario(&self, name: &str) -> Result<bool, StoreError> {
        let mut scenarios = self
            .scenarios
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(scenarios.remove(&name.to_lowercase()).is_some())
    }
}
