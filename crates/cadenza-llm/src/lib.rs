//! # Cadenza LLM
//!
//! Provider-facing conversation driver for the Cadenza scenario runtime:
//! - `ChatClient`: the consumed chat-completions + tool-calling interface
//! - `OpenAiChatClient`: OpenAI-compatible HTTP client with bounded retries
//! - `ChatCompletionAdapter`: the tool-calling loop behind `CompletionAdapter`

mod adapter;
mod client;
mod openai;

pub use adapter::{ChatAdapterConfig, ChatCompletionAdapter};
pub use client::{
    ChatClient, ChatClientError, ChatCompletion, ChatMessage, ChatOptions, ChatRequest,
    ScriptedChatClient, TokenUsage, ToolCallRequest,
};
pub use openai::{OpenAiChatClient, OpenAiClientConfig};
