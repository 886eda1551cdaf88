//! # Cadenza Core
//!
//! Core abstractions and deterministic logic for the Cadenza scenario runtime.
//!
//! This crate contains:
//! - Scenario definition / runtime scenario / completion data model
//! - Context store traits and the canonical key schema
//! - Function and schema registries
//! - Scenario loading, validation, and lowering to the runtime form
//! - The provider-facing completion adapter trait
//!
//! This crate does NOT care about:
//! - How scenarios are stored (filesystem, memory, remote)
//! - Which chat-completion provider is behind the adapter
//! - How stages are scheduled or pipelined

pub mod adapter;
pub mod error;
pub mod functions;
pub mod scenario;
pub mod schema;
pub mod store;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::{AdapterError, CancellationToken, CompletionAdapter};
    pub use crate::error::{DefinitionError, ValidationIssue};
    pub use crate::functions::{FunctionError, FunctionRegistry, ScenarioFunction};
    pub use crate::scenario::{
        load_definition, parse_definition, validate_definition, validate_runtime_scenario,
        ScenarioBuilder, ScenarioStore,
    };
    pub use crate::schema::{SchemaError, SchemaProvider, SchemaRegistry};
    pub use crate::store::{keys, ConversationTurn, ItemStore, StoreError, TurnStore};
    pub use crate::types::{
        CompletionMetadata, CompletionPrompt, CompletionResult, FunctionCallConfig,
        FunctionCallRule, FunctionDefinition, FunctionSpec, FunctionsDefinition, PromptTurn,
        ResponseFormat, ResponseFormatConfig, ResponseFormatKind, RuntimeStage, ScenarioDefinition,
        ScenarioPrompt, StageDefinition, ToolCallAudit, ToolDefinition, ToolSpec, TurnParameters,
        TurnRole, UserPromptDefinition,
    };
}

// Re-export key types at crate root
pub use adapter::{AdapterError, CancellationToken, CompletionAdapter};
pub use error::{DefinitionError, ValidationIssue};
pub use functions::{FunctionError, FunctionRegistry, ScenarioFunction};
pub use scenario::{ScenarioBuilder, ScenarioStore};
pub use schema::{SchemaProvider, SchemaRegistry};
pub use store::{ConversationTurn, ItemStore, StoreError, TurnStore};
pub use types::{
    CompletionPrompt, CompletionResult, PromptTurn, RuntimeStage, ScenarioDefinition,
    ScenarioPrompt, ToolCallAudit, TurnParameters, TurnRole,
};
