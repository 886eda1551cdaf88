//! Completion prompts and results exchanged with the adapter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::runtime::PromptTurn;

/// Metadata key carrying the user turn's index among the stage's user turns.
pub const HISTORY_DEPTH_KEY: &str = "history_depth";

/// One provider request: at most one system turn plus exactly one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPrompt {
    pub session_id: String,
    pub system: Option<PromptTurn>,
    pub user: PromptTurn,
    /// Request-side metadata, echoed back on the result.
    pub metadata: HashMap<String, String>,
}

/// The model's terminal response for one completion prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub session_id: String,
    pub system_prompt: Option<String>,
    /// The user turn as sent, with placeholders resolved.
    pub user_prompt: PromptTurn,
    pub content: String,
    pub metadata: CompletionMetadata,
}

/// Provider metadata attached to a completion result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionMetadata {
    pub id: Option<String>,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    /// Audit of every tool call executed during the conversation, in issue order.
    pub tool_calls: Vec<ToolCallAudit>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    /// Request-side metadata echoed from the prompt.
    pub request: HashMap<String, String>,
}

/// A record of one function invocation issued by the model and executed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallAudit {
    pub id: String,
    pub function_name: String,
    pub arguments: Value,
    pub result: String,
}
