//! Declarative scenario definitions as loaded from YAML/JSON files.
//!
//! All keys are camelCase on the wire. Definitions are read-only once
//! loaded; the builder lowers them to the runtime form.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, versioned, ordered sequence of prompt stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    /// Unique identifier; looked up case-insensitively.
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Models this scenario may run against; the first entry is the default.
    #[serde(default)]
    pub valid_models: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Ordered list of stage definitions.
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}

/// One unit of work in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDefinition {
    /// Stable integer id, unique within the scenario.
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Non-empty list of user-prompt definitions.
    #[serde(default)]
    pub user_prompts: Vec<UserPromptDefinition>,
    /// Optional model override; `validModels[0]` applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Stage-level fallback, propagated to prompts that do not override it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Free-form stage parameters, addressable from templates as `{name}`.
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<FunctionsDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// A single user-prompt template within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptDefinition {
    /// Template text with `{{placeholders}}` and `{param}` markers.
    pub template: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format_config: Option<ResponseFormatConfig>,
}

/// Declared response format of a user prompt.
///
/// When `type` is `JsonSchema`, exactly one of `schema` (a JSON-schema
/// literal) or `responseTypeName` (a registered type name) must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFormatConfig {
    #[serde(rename = "type")]
    pub kind: ResponseFormatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type_name: Option<String>,
}

/// Response format discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFormatKind {
    Text,
    JsonObject,
    JsonSchema,
}

/// Function-calling configuration for a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionsDefinition {
    #[serde(default)]
    pub functions: Vec<FunctionDefinition>,
    /// `auto`, `none`, or the name of a specific function. Absent means auto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<String>,
}

/// A callable function exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-schema literal for the function parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    /// Registered type name resolved through the schema registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_type: Option<String>,
}

/// Tool wrapper around a function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    #[serde(rename = "type", default = "default_tool_kind")]
    pub kind: String,
    pub function: FunctionDefinition,
}

fn default_tool_kind() -> String {
    "function".to_string()
}
