//! The per-turn agent loop.
//!
//! One turn is: record the user message, build a system message carrying
//! recent history, optionally wrap the input with retrieved context, make one
//! completion attempt with the full tool registry offered, execute any
//! requested calls, then make a second attempt with no tools to force a text
//! answer. Every failure path converts into exactly one recorded
//! assistant-role message; `process_turn` itself never errors and a session
//! is always left awaiting the next input.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use crate::agent::{Session, ToolRegistry};
use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatResponse, CompletionProvider, GenerationConfig};
use crate::retrieval::{format_context, RetrievalAdapter, DEFAULT_TOP_K, SNIPPET_MAX_CHARS};

/// Baseline system instructions, used unless the caller overrides them.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions based on the provided context. \
     Use the document database context if relevant. \
     If no specific context is available, answer from your own knowledge. \
     Provide clear, concise, and educational answers.";

/// Returned when the synthesis attempt produces blank output.
pub const NO_ANSWER_FALLBACK: &str = "no answer available";

/// Shown instead of the raw error when the completion API rate-limits us.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit reached. Please wait a moment and try again.";

/// Knobs for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sampling shared by both completion attempts in a turn.
    pub generation: GenerationConfig,
    /// How many recent memory entries are serialized into the system message.
    pub history_window: usize,
    /// Chunks requested from the retriever per turn.
    pub top_k: usize,
    /// Character budget per snippet in the rendered context block.
    pub snippet_max_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig {
                max_tokens: 2000,
                temperature: 0.7,
                top_p: 0.9,
            },
            history_window: 3,
            top_k: DEFAULT_TOP_K,
            snippet_max_chars: SNIPPET_MAX_CHARS,
        }
    }
}

/// Drives conversation turns against injected collaborators.
///
/// The engine holds no per-conversation state: sessions are owned by the
/// caller and passed `&mut` into [`process_turn`](Self::process_turn), so one
/// engine can serve any number of independent sessions.
pub struct ChatEngine {
    provider: Arc<dyn CompletionProvider>,
    tools: Arc<ToolRegistry>,
    retriever: Option<Arc<dyn RetrievalAdapter>>,
    system_prompt: String,
    config: EngineConfig,
}

impl ChatEngine {
    pub fn new(provider: Arc<dyn CompletionProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            retriever: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            config: EngineConfig::default(),
        }
    }

    /// Wire a retrieval adapter. Without one, turns run on general knowledge
    /// and the user message is passed through unwrapped.
    pub fn with_retriever(mut self, retriever: Arc<dyn RetrievalAdapter>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Drive one conversation turn.
    ///
    /// Returns `None` for whitespace-only input, with nothing recorded.
    /// Otherwise always returns the visible answer: completion failures,
    /// unparseable tool arguments and unknown tool names each become a
    /// recorded assistant message rather than an error.
    pub async fn process_turn(&self, session: &mut Session, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        tracing::debug!(session = %session.id, input_len = input.len(), "Processing turn");

        // 1. Record the user message
        session.memory.add(ChatMessage::user(input));

        // 2. Assemble the request transcript
        let system = self.build_system_message(session);
        let user = self.build_user_message(input).await;
        let mut transcript = vec![ChatMessage::system(system), ChatMessage::user(user)];

        // 3. First attempt, tools offered
        let schemas = self.tools.describe_all();
        let response = match self
            .provider
            .chat(&transcript, &schemas, &self.config.generation)
            .await
        {
            Ok(response) => response,
            Err(e) => return Some(self.record_failure(session, &e)),
        };

        let text = match response {
            ChatResponse::Content(text) => text,
            ChatResponse::ToolCalls(calls) => {
                tracing::info!(
                    count = calls.len(),
                    tools = ?calls.iter().map(|c| &c.name).collect::<Vec<_>>(),
                    "Model requested tool calls"
                );

                // 4. Parse and resolve every call before recording anything,
                // so memory never holds a tool_call without its response.
                let mut parsed_args: Vec<Value> = Vec::with_capacity(calls.len());
                for call in &calls {
                    let args = match serde_json::from_str::<Value>(&call.arguments) {
                        Ok(args) => args,
                        Err(_) => {
                            tracing::warn!(tool = %call.name, "Tool arguments failed to parse");
                            let warning = AgentError::Parse(call.arguments.clone()).to_string();
                            session.memory.add(ChatMessage::assistant(&warning));
                            return Some(warning);
                        }
                    };
                    if !self.tools.contains(&call.name) {
                        tracing::warn!(tool = %call.name, "Model requested unknown tool");
                        let warning = AgentError::UnknownTool(call.name.clone()).to_string();
                        session.memory.add(ChatMessage::assistant(&warning));
                        return Some(warning);
                    }
                    parsed_args.push(args);
                }

                let request = ChatMessage::assistant_tool_calls(calls.clone());
                session.memory.add(request.clone());
                transcript.push(request);

                for (call, args) in calls.iter().zip(&parsed_args) {
                    let output = match self.tools.invoke(&call.name, args).await {
                        Ok(output) => output,
                        // contains() was checked above; should dispatch still
                        // fail, the uniform error shape applies.
                        Err(e) => json!({ "error": e.to_string() }).to_string(),
                    };

                    let result =
                        ChatMessage::tool_result(call.id.clone(), call.name.clone(), output);
                    session.memory.add(result.clone());
                    transcript.push(result);
                }

                // 5. Second attempt, no tools: force natural-language synthesis
                match self
                    .provider
                    .chat(&transcript, &[], &self.config.generation)
                    .await
                {
                    Ok(ChatResponse::Content(text)) => text,
                    Ok(ChatResponse::ToolCalls(_)) => {
                        tracing::warn!("Synthesis attempt requested tools despite none offered");
                        String::new()
                    }
                    Err(e) => return Some(self.record_failure(session, &e)),
                }
            }
        };

        // 6. Record the final answer; blank output gets the fixed fallback
        let answer = if text.trim().is_empty() {
            NO_ANSWER_FALLBACK.to_string()
        } else {
            text
        };
        session.memory.add(ChatMessage::assistant(&answer));
        Some(answer)
    }

    /// One system message: configured instructions, today's date, and the
    /// last few memory entries serialized as JSON so the model (and anyone
    /// reading logs) can see exactly what context was carried.
    fn build_system_message(&self, session: &Session) -> String {
        let recent = session.memory.recent(self.config.history_window);
        let history_json =
            serde_json::to_string_pretty(recent).unwrap_or_else(|_| "[]".to_string());

        format!(
            "{}\nToday's date is {}.\nRecent conversation:\n{}",
            self.system_prompt,
            Utc::now().format("%Y-%m-%d"),
            history_json
        )
    }

    /// The user message for the request: raw input, or input wrapped with the
    /// retrieved-context block when a retriever is wired. Retrieval failures
    /// degrade to the no-context line and the turn proceeds.
    async fn build_user_message(&self, input: &str) -> String {
        let retriever = match &self.retriever {
            Some(retriever) => retriever,
            None => return input.to_string(),
        };

        let context = match retriever.query(input, self.config.top_k).await {
            Ok(chunks) => {
                tracing::debug!(count = chunks.len(), "Retrieved context chunks");
                format_context(&chunks, self.config.snippet_max_chars)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, proceeding without context");
                format_context(&[], self.config.snippet_max_chars)
            }
        };

        format!("Context:\n{}\n\nQuestion: {}", context, input)
    }

    /// Convert a completion failure into the visible assistant message,
    /// record it, and return it. Rate limiting gets dedicated wording; other
    /// failures surface the transport error verbatim.
    fn record_failure(&self, session: &mut Session, error: &anyhow::Error) -> String {
        let reason = error.to_string();
        let message = if reason.contains("429") || reason.contains("rate_limit_exceeded") {
            RATE_LIMIT_MESSAGE.to_string()
        } else {
            AgentError::Network(reason.clone()).to_string()
        };

        tracing::error!(error = %reason, "Completion attempt failed");
        session.memory.add(ChatMessage::assistant(&message));
        message
    }
}
