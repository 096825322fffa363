pub mod agent;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod rag;
pub mod retrieval;

// Re-export primary types for convenience
pub use agent::{AssistantTool, Session, ToolRegistry};
pub use chat::{ChatEngine, EngineConfig};
pub use config::AssistantConfig;
pub use error::AgentError;
pub use memory::ConversationMemory;
pub use rag::{Flashcard, FlashcardDeck};
pub use retrieval::{HostedRetriever, RetrievalAdapter, RetrievedChunk};

// Re-export LLM types
pub use llm::{
    ApiProvider, ChatMessage, ChatResponse, ChatRole, CompletionProvider, ExternalProvider,
    GenerationConfig, ToolCall, ToolSchema,
};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
