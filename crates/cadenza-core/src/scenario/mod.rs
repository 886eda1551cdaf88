//! Scenario loading, validation, and lowering
//!
//! - Loader: parses scenario files (YAML or JSON) into definitions
//! - Validator: enforces well-formedness of definitions and built scenarios
//! - Builder: lowers validated definitions to the runtime representation
//! - ScenarioStore: the leaf interface aggregated by the registry
//!
//! Note: store implementations are in the cadenza-stores crate

mod builder;
mod loader;
mod validator;

pub use builder::ScenarioBuilder;
pub use loader::{load_definition, parse_definition};
pub use validator::{validate_definition, validate_runtime_scenario};

use async_trait::async_trait;

use crate::store::StoreError;
use crate::types::ScenarioPrompt;

/// A source of built scenarios.
///
/// The registry relies on the three read operations; the mutation methods
/// serve administrative flows.
#[async_trait]
pub trait ScenarioStore: Send + Sync {
    /// Look up one scenario by name (case-insensitive)
    async fn get_scenario(&self, name: &str) -> Result<Option<ScenarioPrompt>, StoreError>;

    /// Load every scenario this store can provide
    async fn get_all_scenarios(&self) -> Result<Vec<ScenarioPrompt>, StoreError>;

    /// Names of every scenario this store can provide
    async fn list_scenario_names(&self) -> Result<Vec<String>, StoreError>;

    /// Insert or replace a scenario
    async fn store_scenario(&self, scenario: ScenarioPrompt) -> Result<(), StoreError>;

    /// Delete a scenario by name; returns whether anything was removed
    async fn delete_scenario(&self, name: &str) -> Result<bool, StoreError>;
}
