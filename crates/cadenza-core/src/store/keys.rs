//! Canonical composition of context-store keys.
//!
//! Context keys are stable and composed only through this module. The full
//! schema, with `{stageKey}` = `"{stageId}-{turnIndex+1}"`:
//!
//! - `stage:{stageKey}:input:{name}`
//! - `stage:{stageKey}:input:params:{name}`
//! - `stage:{stageKey}:metadata:{name}`
//! - `stage:{stageKey}:tool:{toolName}:{callId}`
//! - `stage:{stageKey}:output`
//! - `stage:{stageKey}:output:params:{name}`
//! - `stage:{stageKey}:output:{logType}`

/// Well-known input name for the system prompt.
pub const INPUT_SYSTEM_PROMPT: &str = "system_prompt";
/// Well-known input name for the resolved user prompt.
pub const INPUT_USER_PROMPT: &str = "user_prompt";
/// Well-known output-parameter name for the provider execution id.
pub const OUTPUT_EXECUTION_ID: &str = "execution_id";
/// Well-known metadata name for the responding model.
pub const METADATA_OUTPUT_MODEL: &str = "output_model";
/// Well-known metadata name for the finish reason.
pub const METADATA_FINISH_REASON: &str = "finish_reason";
/// Well-known metadata name for prompt token usage.
pub const METADATA_INPUT_TOKENS: &str = "input_tokens";
/// Well-known metadata name for completion token usage.
pub const METADATA_OUTPUT_TOKENS: &str = "output_tokens";
/// Well-known metadata name for total token usage.
pub const METADATA_TOTAL_TOKENS: &str = "total_tokens";

/// Stage key for the given stage id and zero-based user-turn index.
pub fn stage_key(stage_id: i64, turn_index: usize) -> String {
    format!("{}-{}", stage_id, turn_index + 1)
}

/// Key factory bound to one stage key.
#[derive(Debug, Clone)]
pub struct StageKeys {
    stage_key: String,
}

impl StageKeys {
    /// Keys for the given stage id and zero-based user-turn index
    pub fn new(stage_id: i64, turn_index: usize) -> Self {
        Self {
            stage_key: stage_key(stage_id, turn_index),
        }
    }

    /// Keys for an already-formatted stage key (e.g. from a template reference)
    pub fn for_stage_key(stage_key: impl Into<String>) -> Self {
        Self {
            stage_key: stage_key.into(),
        }
    }

    /// The bound stage key
    pub fn stage_key(&self) -> &str {
        &self.stage_key
    }

    /// `stage:{stageKey}:input:{name}`
    pub fn input(&self, name: &str) -> String {
        format!("stage:{}:input:{}", self.stage_key, name)
    }

    /// `stage:{stageKey}:input:params:{name}`
    pub fn input_param(&self, name: &str) -> String {
        format!("stage:{}:input:params:{}", self.stage_key, name)
    }

    /// `stage:{stageKey}:metadata:{name}`
    pub fn metadata(&self, name: &str) -> String {
        format!("stage:{}:metadata:{}", self.stage_key, name)
    }

    /// `stage:{stageKey}:tool:{toolName}:{callId}`
    pub fn tool(&self, function_name: &str, call_id: &str) -> String {
        format!("stage:{}:tool:{}:{}", self.stage_key, function_name, call_id)
    }

    /// `stage:{stageKey}:output`
    pub fn output(&self) -> String {
        format!("stage:{}:output", self.stage_key)
    }

    /// `stage:{stageKey}:output:params:{name}`
    pub fn output_param(&self, name: &str) -> String {
        format!("stage:{}:output:params:{}", self.stage_key, name)
    }

    /// `stage:{stageKey}:output:{logType}`
    pub fn output_log(&self, log_type: &str) -> String {
        format!("stage:{}:output:{}", self.stage_key, log_type)
    }
}
