//! OpenAI-compatible HTTP chat client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use async_trait::async_trait;

use cadenza_core::adapter::CancellationToken;
use cadenza_core::types::{FunctionCallRule, ResponseFormat};

use crate::client::{
    ChatClient, ChatClientError, ChatCompletion, ChatRequest, TokenUsage, ToolCallRequest,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

/// HTTP client config (OpenAI-compatible)
#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub timeout: Duration,
    /// Retries on transport errors, on top of the initial attempt.
    pub max_retries: u32,
}

impl OpenAiClientConfig {
    /// Create a config with provider-standard defaults
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization_id: None,
            project_id: None,
            timeout: Duration::from_secs(120),
            max_retries: 5,
        }
    }
}

/// HTTP chat client for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    headers: HeaderMap,
    endpoint: String,
    max_retries: u32,
}

impl OpenAiChatClient {
    /// Create a client from the given config
    pub fn new(config: OpenAiClientConfig) -> Result<Self, ChatClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ChatClientError::Config(
                "api_key must not be empty".to_string(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(ChatClientError::Config(
                "timeout must be positive".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = format!("Bearer {}", config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|e| ChatClientError::Config(e.to_string()))?,
        );
        if let Some(organization) = &config.organization_id {
            headers.insert(
                "OpenAI-Organization",
                HeaderValue::from_str(organization)
                    .map_err(|e| ChatClientError::Config(e.to_string()))?,
            );
        }
        if let Some(project) = &config.project_id {
            headers.insert(
                "OpenAI-Project",
                HeaderValue::from_str(project)
                    .map_err(|e| ChatClientError::Config(e.to_string()))?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            headers,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            max_retries: config.max_retries,
        })
    }

    async fn send_once(&self, body: &Value) -> Result<ChatCompletion, ChatClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| ChatClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ChatClientError::Transport(e.to_string()))?;
        let parsed: WireResponse =
            serde_json::from_str(&text).map_err(|e| ChatClientError::Serialization(e.to_string()))?;
        parsed.into_completion()
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion, ChatClientError> {
        let body = build_request_body(&request)?;
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(ChatClientError::Cancelled);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ChatClientError::Cancelled),
                result = self.send_once(&body) => result,
            };

            match result {
                Ok(completion) => {
                    debug!(
                        model = %request.model,
                        finish_reason = completion.finish_reason.as_deref().unwrap_or(""),
                        tool_call_count = completion.tool_calls.len(),
                        "chat completion received"
                    );
                    return Ok(completion);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!(
                        model = %request.model,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "chat completion failed; retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ChatClientError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(16);
    RETRY_BASE_DELAY
        .saturating_mul(1u32 << exponent)
        .min(RETRY_MAX_DELAY)
}

fn build_request_body(request: &ChatRequest) -> Result<Value, ChatClientError> {
    let messages = request
        .messages
        .iter()
        .map(|message| {
            let mut wire = json!({ "role": message.role });
            if let Some(content) = &message.content {
                wire["content"] = json!(content);
            }
            if !message.tool_calls.is_empty() {
                wire["tool_calls"] = Value::Array(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments,
                                },
                            })
                        })
                        .collect(),
                );
            }
            if let Some(id) = &message.tool_call_id {
                wire["tool_call_id"] = json!(id);
            }
            wire
        })
        .collect::<Vec<_>>();

    let options = &request.options;
    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "temperature": options.temperature,
        "top_p": options.top_p,
        "max_tokens": options.max_tokens,
    });

    if let Some(format) = &options.response_format {
        body["response_format"] = response_format_body(format)?;
    }

    if !options.tools.is_empty() {
        body["tools"] = Value::Array(
            options
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.function.name,
                            "description": tool.function.description,
                            "parameters": tool.function.parameters,
                            "strict": true,
                        },
                    })
                })
                .collect(),
        );
        body["tool_choice"] = match &options.tool_choice {
            FunctionCallRule::Auto => json!("auto"),
            FunctionCallRule::None => json!("none"),
            FunctionCallRule::Specific(name) => {
                json!({ "type": "function", "function": { "name": name } })
            }
        };
        body["parallel_tool_calls"] = json!(options.parallel_tool_calls);
    }

    Ok(body)
}

fn response_format_body(format: &ResponseFormat) -> Result<Value, ChatClientError> {
    match format {
        ResponseFormat::Text => Ok(json!({ "type": "text" })),
        ResponseFormat::JsonObject => Ok(json!({ "type": "json_object" })),
        ResponseFormat::JsonSchema { schema } => {
            let schema: Value = serde_json::from_str(schema).map_err(|e| {
                ChatClientError::Serialization(format!("response schema is not valid JSON: {}", e))
            })?;
            Ok(json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "strict": true,
                    "schema": schema,
                },
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl WireResponse {
    fn into_completion(self) -> Result<ChatCompletion, ChatClientError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatClientError::Serialization("response has no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let usage = self.usage.map(|usage| TokenUsage {
            input_tokens: usage.prompt_tokens.unwrap_or(0),
            output_tokens: usage.completion_tokens.unwrap_or(0),
            total_tokens: usage.total_tokens.unwrap_or(0),
        });

        Ok(ChatCompletion {
            id: self.id,
            model: self.model,
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason,
            usage,
        })
    }
}
