//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/v1/chat/completions`. Tools are offered through the `functions` field
//! and tool results go back as `function` role messages carrying the tool
//! name, so a tool result can be replayed without the call that produced it.

use async_trait::async_trait;
use parley_core::error::ProviderError;
use parley_core::message::{ContentPart, MessageContent, ModelMessage, Role};
use parley_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Self::client_with_timeout(120),
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Replace the HTTP client with one using a different request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.client = Self::client_with_timeout(secs);
        self
    }

    fn client_with_timeout(secs: u64) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
                reqwest::Client::new()
            })
    }

    /// Convert our messages to OpenAI API format.
    fn to_api_messages(messages: &[ModelMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| {
                let (role, name) = match m.role {
                    Role::System => ("system", None),
                    Role::User => ("user", m.author_id.as_deref().map(api_name)),
                    Role::Assistant => ("assistant", None),
                    Role::ToolResult => ("function", m.tool_name.as_deref().map(api_name)),
                };
                ApiMessage {
                    role: role.into(),
                    content: Some(ApiContent::from(&m.content)),
                    name,
                    function_call: None,
                    tool_calls: None,
                }
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI `functions` format.
    fn to_api_functions(tools: &[ToolDefinition]) -> Vec<ApiFunctionDefinition> {
        tools
            .iter()
            .map(|t| ApiFunctionDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect()
    }

    /// Decide whether the model answered or asked for a tool.
    fn parse_reply(message: ApiMessage) -> ModelReply {
        if let Some(call) = message.function_call {
            return ModelReply::ToolCall(ToolCallRequest {
                name: call.name,
                arguments: call.arguments,
            });
        }

        if let Some(mut calls) = message.tool_calls.filter(|c| !c.is_empty()) {
            if calls.len() > 1 {
                warn!(count = calls.len(), "Model requested several tools at once, running the first");
            }
            let call = calls.swap_remove(0);
            return ModelReply::ToolCall(ToolCallRequest {
                name: call.function.name,
                arguments: call.function.arguments,
            });
        }

        let text = match message.content {
            Some(ApiContent::Text(text)) => text,
            Some(ApiContent::Parts(parts)) => parts
                .into_iter()
                .filter_map(|p| match p {
                    ApiContentPart::Text { text } => Some(text),
                    ApiContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        };
        ModelReply::Answer(text)
    }

    fn status_error(status: u16, body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited { retry_after_secs: 5 },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

/// OpenAI restricts `name` to `[a-zA-Z0-9_-]{1,64}`.
fn api_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(64)
        .collect()
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl parley_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["functions"] = serde_json::json!(Self::to_api_functions(&request.tools));
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(Self::status_error(status, error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            reply: Self::parse_reply(choice.message),
            usage,
            model: api_response.model,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiContentPart>),
}

impl From<&MessageContent> for ApiContent {
    fn from(content: &MessageContent) -> Self {
        match content {
            MessageContent::Text(text) => Self::Text(text.clone()),
            MessageContent::Parts(parts) => Self::Parts(
                parts
                    .iter()
                    .map(|p| match p {
                        ContentPart::Text { text } => ApiContentPart::Text { text: text.clone() },
                        ContentPart::Image { url } => ApiContentPart::ImageUrl {
                            image_url: ApiImageUrl { url: url.clone() },
                        },
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiImageUrl {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDefinition {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
