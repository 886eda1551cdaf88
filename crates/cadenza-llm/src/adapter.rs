//! Tool-calling completion adapter.
//!
//! Owns one chat client per supported model, builds request options from
//! the user turn's parameters, and drives the model ↔ tool-function loop
//! until the model produces a terminal response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, info};

use cadenza_core::adapter::{AdapterError, CancellationToken, CompletionAdapter};
use cadenza_core::functions::{FunctionRegistry, ScenarioFunction};
use cadenza_core::types::{
    CompletionMetadata, CompletionPrompt, CompletionResult, FunctionCallRule, PromptTurn,
    ToolCallAudit, ToolSpec, TurnRole,
};

use crate::client::{ChatClient, ChatClientError, ChatMessage, ChatOptions, ChatRequest, ToolCallRequest};
use crate::openai::{OpenAiChatClient, OpenAiClientConfig};

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f64 = 1.0;
const DEFAULT_TOP_P: f64 = 1.0;

/// Completion adapter configuration.
#[derive(Debug, Clone)]
pub struct ChatAdapterConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    /// Models served by this adapter; one client is opened per model.
    pub supported_models: Vec<String>,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub timeout_seconds: u64,
    /// Execute multiple tool calls from one response concurrently.
    pub allow_parallel_tool_calls: bool,
    /// Bound on tool-call rounds per conversation; unbounded when absent.
    pub max_tool_rounds: Option<u32>,
}

impl ChatAdapterConfig {
    /// Create a config with provider-standard defaults
    pub fn new(api_key: impl Into<String>, supported_models: Vec<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            supported_models,
            organization_id: None,
            project_id: None,
            timeout_seconds: 120,
            allow_parallel_tool_calls: false,
            max_tool_rounds: None,
        }
    }

    fn validate(&self) -> Result<(), AdapterError> {
        if self.api_key.trim().is_empty() {
            return Err(AdapterError::InvalidInput(
                "api_key must not be empty".to_string(),
            ));
        }
        if self.supported_models.is_empty() {
            return Err(AdapterError::InvalidInput(
                "supported_models must not be empty".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(AdapterError::InvalidInput(
                "timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chat-completions adapter with a tool-calling conversation loop.
pub struct ChatCompletionAdapter {
    clients: HashMap<String, Arc<dyn ChatClient>>,
    functions: Arc<FunctionRegistry>,
    allow_parallel_tool_calls: bool,
    max_tool_rounds: Option<u32>,
}

impl ChatCompletionAdapter {
    /// Create an adapter opening one OpenAI-compatible client per model
    pub fn new(
        config: ChatAdapterConfig,
        functions: Arc<FunctionRegistry>,
    ) -> Result<Self, AdapterError> {
        config.validate()?;

        let mut clients: HashMap<String, Arc<dyn ChatClient>> = HashMap::new();
        for model in &config.supported_models {
            let mut client_config = OpenAiClientConfig::new(config.api_key.clone());
            if let Some(base_url) = &config.base_url {
                client_config.base_url = base_url.clone();
            }
            client_config.organization_id = config.organization_id.clone();
            client_config.project_id = config.project_id.clone();
            client_config.timeout = Duration::from_secs(config.timeout_seconds);

            let client = OpenAiChatClient::new(client_config)
                .map_err(|e| AdapterError::InvalidInput(e.to_string()))?;
            clients.insert(model.clone(), Arc::new(client));
        }

        Ok(Self {
            clients,
            functions,
            allow_parallel_tool_calls: config.allow_parallel_tool_calls,
            max_tool_rounds: config.max_tool_rounds,
        })
    }

    /// Create an adapter over pre-built clients (tests, custom providers)
    pub fn with_clients(
        clients: HashMap<String, Arc<dyn ChatClient>>,
        functions: Arc<FunctionRegistry>,
        allow_parallel_tool_calls: bool,
        max_tool_rounds: Option<u32>,
    ) -> Self {
        Self {
            clients,
            functions,
            allow_parallel_tool_calls,
            max_tool_rounds,
        }
    }

    fn build_options(&self, user: &PromptTurn) -> ChatOptions {
        let parameters = &user.parameters;

        let mut tools: Vec<ToolSpec> = Vec::new();
        if let Some(config) = &parameters.functions {
            tools.extend(config.functions.iter().cloned().map(|function| ToolSpec {
                function,
            }));
        }
        tools.extend(parameters.tools.iter().cloned());

        let tool_choice = parameters
            .functions
            .as_ref()
            .map(|config| config.call.clone())
            .unwrap_or(FunctionCallRule::Auto);

        ChatOptions {
            temperature: parameters.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: parameters.top_p.unwrap_or(DEFAULT_TOP_P),
            max_tokens: parameters.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            response_format: parameters.response_format.clone(),
            tools,
            tool_choice,
            parallel_tool_calls: self.allow_parallel_tool_calls,
        }
    }

    /// Parse, resolve, and execute one round of tool calls.
    ///
    /// Every function is resolved before anything executes, so an unknown
    /// name aborts the round without side effects. Results come back in
    /// issue order regardless of execution mode.
    async fn execute_tool_calls(
        &self,
        calls: &[ToolCallRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolCallAudit>, AdapterError> {
        let mut resolved: Vec<(Arc<dyn ScenarioFunction>, Value)> = Vec::with_capacity(calls.len());
        for call in calls {
            let arguments: Value = serde_json::from_str(&call.arguments).map_err(|e| {
                AdapterError::Serialization(format!(
                    "arguments of tool call '{}' are not valid JSON: {}",
                    call.name, e
                ))
            })?;
            let function = self
                .functions
                .get(&call.name)
                .ok_or_else(|| AdapterError::ToolMissing(call.name.clone()))?;
            resolved.push((function, arguments));
        }

        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }

        let mut results: Vec<(Value, String)> = Vec::with_capacity(resolved.len());
        if self.allow_parallel_tool_calls {
            let outcomes = join_all(resolved.into_iter().map(|(function, arguments)| {
                async move {
                    let result = function.call(arguments.clone()).await;
                    (arguments, result)
                }
            }))
            .await;
            for (index, (arguments, outcome)) in outcomes.into_iter().enumerate() {
                let result = outcome.map_err(|e| {
                    AdapterError::Provider(format!(
                        "function '{}' failed: {}",
                        calls[index].name, e
                    ))
                })?;
                results.push((arguments, result));
            }
        } else {
            for (index, (function, arguments)) in resolved.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    return Err(AdapterError::Cancelled);
                }
                let result = function.call(arguments.clone()).await.map_err(|e| {
                    AdapterError::Provider(format!(
                        "function '{}' failed: {}",
                        calls[index].name, e
                    ))
                })?;
                results.push((arguments, result));
            }
        }

        Ok(calls
            .iter()
            .zip(results)
            .map(|(call, (arguments, result))| ToolCallAudit {
                id: call.id.clone(),
                function_name: call.name.clone(),
                arguments,
                result,
            })
            .collect())
    }
}

#[async_trait]
impl CompletionAdapter for ChatCompletionAdapter {
    fn supported_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.clients.keys().cloned().collect();
        models.sort();
        models
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &CompletionPrompt,
        cancel: &CancellationToken,
    ) -> Result<CompletionResult, AdapterError> {
        let client = self.clients.get(model).ok_or_else(|| {
            AdapterError::InvalidInput(format!("model '{}' is not supported", model))
        })?;
        if prompt.user.role != TurnRole::User {
            return Err(AdapterError::InvalidInput(format!(
                "completion prompt requires a user turn, got '{}'",
                prompt.user.role.as_str()
            )));
        }

        let options = self.build_options(&prompt.user);
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(ChatMessage::system(system.content.clone()));
        }
        messages.push(ChatMessage::user(prompt.user.content.clone()));

        let mut audits: Vec<ToolCallAudit> = Vec::new();
        let mut rounds = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(AdapterError::Cancelled);
            }

            let request = ChatRequest {
                model: model.to_string(),
                messages: messages.clone(),
                options: options.clone(),
            };
            let completion = client
                .complete_chat(request, cancel)
                .await
                .map_err(map_client_error)?;

            if completion.tool_calls.is_empty() {
                info!(
                    session_id = %prompt.session_id,
                    model,
                    tool_call_count = audits.len(),
                    finish_reason = completion.finish_reason.as_deref().unwrap_or(""),
                    "completion finished"
                );
                return Ok(CompletionResult {
                    session_id: prompt.session_id.clone(),
                    system_prompt: prompt.system.as_ref().map(|s| s.content.clone()),
                    user_prompt: prompt.user.clone(),
                    content: completion.content.unwrap_or_default(),
                    metadata: CompletionMetadata {
                        id: completion.id,
                        model: completion.model.or_else(|| Some(model.to_string())),
                        finish_reason: completion.finish_reason,
                        tool_calls: audits,
                        input_tokens: completion.usage.map(|u| u.input_tokens),
                        output_tokens: completion.usage.map(|u| u.output_tokens),
                        total_tokens: completion.usage.map(|u| u.total_tokens),
                        request: prompt.metadata.clone(),
                    },
                });
            }

            rounds += 1;
            if let Some(max) = self.max_tool_rounds {
                if rounds > max {
                    return Err(AdapterError::Provider(format!(
                        "tool-call rounds exceeded the configured bound of {}",
                        max
                    )));
                }
            }
            debug!(
                session_id = %prompt.session_id,
                model,
                round = rounds,
                call_count = completion.tool_calls.len(),
                "executing tool calls"
            );

            messages.push(ChatMessage::assistant_tool_calls(
                completion.tool_calls.clone(),
            ));
            let round_audits = self
                .execute_tool_calls(&completion.tool_calls, cancel)
                .await?;
            for audit in &round_audits {
                messages.push(ChatMessage::tool(audit.id.clone(), audit.result.clone()));
            }
            audits.extend(round_audits);
        }
    }
}

fn map_client_error(error: ChatClientError) -> AdapterError {
    match error {
        ChatClientError::Cancelled => AdapterError::Cancelled,
        ChatClientError::Serialization(message) => AdapterError::Serialization(message),
        ChatClientError::Config(message) => AdapterError::InvalidInput(message),
        other => AdapterError::Provider(other.to_string()),
    }
}
