//! Completion adapter trait
//!
//! The adapter drives one provider-facing conversation per completion
//! prompt, including tool-calling iterations. Implementations live outside
//! this crate (see cadenza-llm).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{CompletionPrompt, CompletionResult};

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;

/// Adapter errors
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid completion input: {0}")]
    InvalidInput(String),

    #[error("model requested unregistered function '{0}'")]
    ToolMissing(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("completion cancelled")]
    Cancelled,
}

/// Provider-facing conversation driver.
///
/// `complete` runs the model ↔ tool-function loop until the model produces
/// a terminal response, and returns that response with an audit of tool
/// calls and token usage.
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    /// Models this adapter can serve
    fn supported_models(&self) -> Vec<String>;

    /// Run one completion conversation for the given model
    async fn complete(
        &self,
        model: &str,
        prompt: &CompletionPrompt,
        cancel: &CancellationToken,
    ) -> Result<CompletionResult, AdapterError>;
}
