//! Type definitions for the Cadenza data model
//!
//! - Definition types: the declarative form loaded from scenario files
//! - Runtime types: the lowered form executed by the stage pipeline
//! - Completion types: prompts sent to and results returned by the adapter

mod completion;
mod definition;
mod runtime;

pub use completion::{
    CompletionMetadata, CompletionPrompt, CompletionResult, ToolCallAudit, HISTORY_DEPTH_KEY,
};
pub use definition::{
    FunctionDefinition, FunctionsDefinition, ResponseFormatConfig, ResponseFormatKind,
    ScenarioDefinition, StageDefinition, ToolDefinition, UserPromptDefinition,
};
pub use runtime::{
    FunctionCallConfig, FunctionCallRule, FunctionSpec, PromptTurn, ResponseFormat, RuntimeStage,
    ScenarioPrompt, ToolSpec, TurnParameters, TurnRole,
};
