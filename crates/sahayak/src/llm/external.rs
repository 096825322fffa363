//! Hosted chat-completion client (OpenAI-compatible APIs).
//!
//! One request per call, no retries: a failed attempt surfaces as an error
//! the engine turns into a visible answer. Groq is the default deployment
//! target; any OpenAI-compatible endpoint works through `Custom`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    ChatMessage, ChatResponse, ChatRole, CompletionProvider, GenerationConfig, ToolCall, ToolSchema,
};
use crate::error::AgentError;

/// Which hosted completion API to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiProvider {
    Groq,
    OpenAI,
    Custom { endpoint: String },
}

/// Completion client for OpenAI-compatible chat APIs.
pub struct ExternalProvider {
    provider: ApiProvider,
    api_key: String,
    model: String,
    client: Client,
}

impl ExternalProvider {
    /// Build a client. Fails fast with `MissingCredential` when the key is
    /// absent, before any request is attempted.
    pub fn new(provider: ApiProvider, api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AgentError::MissingCredential(
                "completion API key is empty. Export GROQ_API_KEY or add it to .env".to_string(),
            )
            .into());
        }

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        tracing::info!(
            provider = ?provider,
            model = %model,
            "Creating completion client (connect_timeout=15s, timeout=120s)"
        );

        Ok(Self {
            provider,
            api_key,
            model,
            client,
        })
    }

    fn get_endpoint(&self) -> String {
        match &self.provider {
            ApiProvider::Groq => "https://api.groq.com/openai/v1/chat/completions".to_string(),
            ApiProvider::OpenAI => "https://api.openai.com/v1/chat/completions".to_string(),
            ApiProvider::Custom { endpoint } => endpoint.clone(),
        }
    }

    /// Parse a response body as JSON, returning a clear error if the server
    /// returned HTML (e.g. a gateway error page) instead of valid JSON.
    async fn parse_json_response(response: reqwest::Response, endpoint: &str) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", endpoint, e))?;

        let trimmed = body.trim_start();
        if trimmed.starts_with('<') || trimmed.starts_with("<!") {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(anyhow!(
                "Endpoint {} returned HTML instead of JSON (HTTP {}). Response: {}",
                endpoint,
                status,
                preview
            ));
        }

        serde_json::from_str::<Value>(&body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            anyhow!(
                "Failed to parse JSON from {} (HTTP {}): {}. Response body: {}",
                endpoint,
                status,
                e,
                preview
            )
        })
    }
}

// ==================== Wire formatting ====================

fn format_openai_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                ChatRole::Tool => "tool",
            };
            let mut msg = json!({ "role": role });
            if let Some(ref content) = m.content {
                msg["content"] = json!(content);
            }
            if let Some(ref calls) = m.tool_calls {
                msg["tool_calls"] = json!(calls
                    .iter()
                    .map(|tc| json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments,
                        }
                    }))
                    .collect::<Vec<_>>());
            }
            if let Some(ref id) = m.tool_call_id {
                msg["tool_call_id"] = json!(id);
            }
            if let Some(ref name) = m.name {
                msg["name"] = json!(name);
            }
            msg
        })
        .collect()
}

fn format_openai_tools(tools: &[ToolSchema]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect()
}

/// Extract the assistant reply from a chat-completions body: tool calls win
/// over content when both are present.
fn parse_chat_choice(body: &Value) -> ChatResponse {
    let choice = &body["choices"][0]["message"];

    if let Some(tool_calls) = choice["tool_calls"].as_array() {
        let calls: Vec<ToolCall> = tool_calls
            .iter()
            .filter_map(|tc| {
                Some(ToolCall {
                    id: tc["id"].as_str()?.to_string(),
                    name: tc["function"]["name"].as_str()?.to_string(),
                    arguments: tc["function"]["arguments"].as_str()?.to_string(),
                })
            })
            .collect();
        if !calls.is_empty() {
            return ChatResponse::ToolCalls(calls);
        }
    }

    let content = choice["content"].as_str().unwrap_or("").to_string();
    ChatResponse::Content(content)
}

#[async_trait]
impl CompletionProvider for ExternalProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &GenerationConfig,
    ) -> Result<ChatResponse> {
        let mut request = json!({
            "model": self.model,
            "messages": format_openai_messages(messages),
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "stream": false
        });

        if !tools.is_empty() {
            request["tools"] = json!(format_openai_tools(tools));
            request["tool_choice"] = json!("auto");
        }

        let endpoint = self.get_endpoint();
        tracing::debug!(
            endpoint = %endpoint,
            model = %self.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!(
                        "Chat request to {} timed out. Check network connectivity",
                        endpoint
                    )
                } else if e.is_connect() {
                    anyhow!("Failed to connect to {}: {}", endpoint, e)
                } else {
                    anyhow!("Chat request to {} failed: {}", endpoint, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await?;
            tracing::error!(endpoint = %endpoint, status = %status, error = %error, "Chat API returned error");
            return Err(anyhow!("Chat API error ({}): {}", status, error));
        }

        let body = Self::parse_json_response(response, &endpoint).await?;
        Ok(parse_chat_choice(&body))
    }
}
