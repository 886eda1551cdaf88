//! Chat client interface consumed by the completion adapter.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use cadenza_core::adapter::CancellationToken;
use cadenza_core::types::{FunctionCallRule, ResponseFormat, ToolSpec};

/// Chat client errors
#[derive(Debug, Error)]
pub enum ChatClientError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ChatClientError {
    /// Whether the retry policy applies to this error
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatClientError::Transport(_) => true,
            ChatClientError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// One message in the provider conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// `system`, `user`, `assistant`, or `tool`.
    pub role: String,
    pub content: Option<String>,
    /// Tool calls echoed on an assistant message.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Id of the tool call a `tool` message answers.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message echoing the model's tool calls
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool message answering the given call id
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool call issued by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// Request options derived from the user turn's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub response_format: Option<ResponseFormat>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: FunctionCallRule,
    pub parallel_tool_calls: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 4096,
            response_format: None,
            tools: Vec::new(),
            tool_choice: FunctionCallRule::Auto,
            parallel_tool_calls: false,
        }
    }
}

/// One provider request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: ChatOptions,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// One provider response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    pub id: Option<String>,
    pub model: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// LLM provider interface
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion, ChatClientError>;
}

/// Scripted chat client for tests and examples.
///
/// Plays back a fixed sequence of completions and records every request.
pub struct ScriptedChatClient {
    responses: Mutex<VecDeque<ChatCompletion>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    /// Create a client playing back the given completions in order
    pub fn new(responses: Vec<ChatCompletion>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete_chat(
        &self,
        request: ChatRequest,
        _cancel: &CancellationToken,
    ) -> Result<ChatCompletion, ChatClientError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let mut responses = self
            .responses
            .lock()
            .map_err(|e| ChatClientError::Transport(e.to_string()))?;
        responses.pop_front().ok_or(ChatClientError::Api {
            status: 500,
            message: "scripted responses exhausted".to_string(),
        })
    }
}
