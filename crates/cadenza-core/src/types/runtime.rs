//! Runtime scenario representation produced by the builder.
//!
//! The untyped parameter bag of the declarative form is lowered into
//! [`TurnParameters`]: typed optional knobs plus a free-form `extras` map.
//! The builder is the sole writer of the typed fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::completion::{CompletionPrompt, HISTORY_DEPTH_KEY};

/// Role of a single message in the chat conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Function,
}

impl TurnRole {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::System => "system",
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::Function => "function",
        }
    }
}

/// Typed per-turn knobs plus a free-form `extras` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<FunctionCallConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    /// Free-form parameters, addressable from templates as `{name}`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extras: HashMap<String, Value>,
}

/// Resolved response format; `JsonSchema` always carries a non-empty schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { schema: String },
}

/// Functions offered to the model plus the invocation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallConfig {
    pub functions: Vec<FunctionSpec>,
    #[serde(default)]
    pub call: FunctionCallRule,
}

/// How the model is allowed to pick a function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCallRule {
    #[default]
    Auto,
    None,
    Specific(String),
}

/// A function with its resolved JSON-schema parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Resolved parameter schema; `{}` when the definition supplied none.
    pub parameters: Value,
}

/// Tool wrapper around a resolved function spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub function: FunctionSpec,
}

/// A single message in the chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parameters: TurnParameters,
}

impl PromptTurn {
    /// Create a turn with the given role and content
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            parameters: TurnParameters::default(),
        }
    }

    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// Set the turn name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the turn parameters
    pub fn with_parameters(mut self, parameters: TurnParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A built, runtime-ready stage.
///
/// `turns` is `[system?, user1, user2, ...]`: at most one system turn,
/// one or more user turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStage {
    pub id: i64,
    pub name: String,
    pub turns: Vec<PromptTurn>,
    /// Concrete model for this stage; the builder inlines the scenario
    /// default when the definition has no override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: TurnParameters,
}

impl RuntimeStage {
    /// The stage's system turn, if any
    pub fn system_turn(&self) -> Option<&PromptTurn> {
        self.turns.iter().find(|t| t.role == TurnRole::System)
    }

    /// The stage's user turns in declared order
    pub fn user_turns(&self) -> impl Iterator<Item = &PromptTurn> {
        self.turns.iter().filter(|t| t.role == TurnRole::User)
    }

    /// One completion prompt per user turn, in declared order.
    ///
    /// Each prompt carries the ambient metadata plus its `history_depth`:
    /// the index of the user turn among the stage's user turns.
    pub fn to_completion_prompts(
        &self,
        session_id: &str,
        metadata: &HashMap<String, String>,
    ) -> Vec<CompletionPrompt> {
        let system = self.system_turn().cloned();
        self.user_turns()
            .enumerate()
            .map(|(depth, user)| {
                let mut prompt_metadata = metadata.clone();
                prompt_metadata.insert(HISTORY_DEPTH_KEY.to_string(), depth.to_string());
                CompletionPrompt {
                    session_id: session_id.to_string(),
                    system: system.clone(),
                    user: user.clone(),
                    metadata: prompt_metadata,
                }
            })
            .collect()
    }
}

/// A built, runtime-ready scenario keyed by name in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPrompt {
    pub name: String,
    pub stages: Vec<RuntimeStage>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ScenarioPrompt {
    /// Locate a stage by id
    pub fn stage(&self, stage_id: i64) -> Option<&RuntimeStage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }
}
