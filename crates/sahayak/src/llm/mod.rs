//! Chat-completion types and the provider seam.
//!
//! Messages follow the OpenAI-style wire contract: role-tagged entries where
//! assistant messages may carry tool calls and tool messages answer them by
//! id. Tool-call arguments stay a JSON-encoded string end to end; decoding
//! them is the engine's job, not the transport's.

pub mod external;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use external::{ApiProvider, ExternalProvider};

// ==================== Messages ====================

/// Message roles, serialized lowercase to match the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in a conversation transcript.
///
/// `content` is optional because an assistant message that requests tool
/// calls may carry none. `tool_call_id` and `name` are set only on tool
/// result messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// Assistant message carrying tool-call requests and no content.
    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
            name: None,
        }
    }

    /// Tool result answering the call with the given id.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(output.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
            name: Some(tool_name.into()),
        }
    }
}

/// A tool invocation requested by the model.
///
/// `arguments` is the raw JSON-encoded string from the wire, preserved
/// verbatim so parse failures can be reported with the original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

// ==================== Tool schemas ====================

/// Metadata describing one callable tool, handed to the completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: Value,
}

// ==================== Completion contract ====================

/// What a completion attempt produced: plain text, or tool-call requests.
#[derive(Debug, Clone)]
pub enum ChatResponse {
    Content(String),
    ToolCalls(Vec<ToolCall>),
}

/// Sampling parameters for one completion request.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// The seam the engine consumes. One blocking attempt per call: retries,
/// backoff and streaming are deliberately absent from this contract.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &GenerationConfig,
    ) -> Result<ChatResponse>;
}
