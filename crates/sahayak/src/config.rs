//! Assistant configuration: JSON-loadable settings with validated defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chat::EngineConfig;
use crate::llm::GenerationConfig;
use crate::memory::DEFAULT_CAPACITY;
use crate::retrieval::hosted::{DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL};
use crate::retrieval::{DEFAULT_TOP_K, SNIPPET_MAX_CHARS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub chat: ChatSettings,
    pub memory: MemorySettings,
    pub retrieval: RetrievalSettings,
    pub flashcards: FlashcardSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Memory entries serialized into each request's system message.
    pub history_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub snippet_max_chars: usize,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Shortest answer worth distilling into cards.
    pub min_answer_chars: usize,
    pub export_dir: PathBuf,
}

impl AssistantConfig {
    /// Validate config values, returning errors for clearly broken settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.chat.model.trim().is_empty() {
            return Err("chat.model must not be empty".into());
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err("chat.temperature must be in [0.0, 2.0]".into());
        }
        if self.chat.max_tokens == 0 {
            return Err("chat.max_tokens must be > 0".into());
        }
        if self.memory.capacity == 0 {
            return Err("memory.capacity must be > 0".into());
        }
        if self.retrieval.top_k == 0 {
            return Err("retrieval.top_k must be > 0".into());
        }
        if self.retrieval.snippet_max_chars == 0 {
            return Err("retrieval.snippet_max_chars must be > 0".into());
        }
        if self.retrieval.embedding_dimension == 0 {
            return Err("retrieval.embedding_dimension must be > 0".into());
        }
        if self.flashcards.model.trim().is_empty() {
            return Err("flashcards.model must not be empty".into());
        }
        if !(0.0..=2.0).contains(&self.flashcards.temperature) {
            return Err("flashcards.temperature must be in [0.0, 2.0]".into());
        }
        if self.flashcards.max_tokens == 0 {
            return Err("flashcards.max_tokens must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Engine knobs derived from the chat and retrieval sections.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            generation: GenerationConfig {
                max_tokens: self.chat.max_tokens,
                temperature: self.chat.temperature,
                ..GenerationConfig::default()
            },
            history_window: self.chat.history_window,
            top_k: self.retrieval.top_k,
            snippet_max_chars: self.retrieval.snippet_max_chars,
        }
    }

    /// Sampling for the constrained flashcard call.
    pub fn flashcard_generation(&self) -> GenerationConfig {
        GenerationConfig {
            max_tokens: self.flashcards.max_tokens,
            temperature: self.flashcards.temperature,
            ..GenerationConfig::default()
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        let export_dir = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            chat: ChatSettings {
                model: "llama-3.3-70b-versatile".to_string(),
                temperature: 0.7,
                max_tokens: 2000,
                history_window: 3,
            },
            memory: MemorySettings {
                capacity: DEFAULT_CAPACITY,
            },
            retrieval: RetrievalSettings {
                top_k: DEFAULT_TOP_K,
                snippet_max_chars: SNIPPET_MAX_CHARS,
                embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
                embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            },
            flashcards: FlashcardSettings {
                model: "llama3-70b-8192".to_string(),
                temperature: 0.3,
                max_tokens: 1000,
                min_answer_chars: 500,
                export_dir,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AssistantConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chat.model, "llama-3.3-70b-versatile");
        assert_eq!(config.memory.capacity, 15);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.flashcards.min_answer_chars, 500);
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = AssistantConfig::default();
        config.memory.capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("memory.capacity"));
    }

    #[test]
    fn test_validation_rejects_out_of_range_temperature() {
        let mut config = AssistantConfig::default();
        config.chat.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_top_k() {
        let mut config = AssistantConfig::default();
        config.retrieval.top_k = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("retrieval.top_k"));
    }

    #[test]
    fn test_engine_config_mirrors_sections() {
        let config = AssistantConfig::default();
        let engine = config.engine_config();
        assert_eq!(engine.generation.max_tokens, 2000);
        assert_eq!(engine.history_window, 3);
        assert_eq!(engine.top_k, 5);
        assert_eq!(engine.snippet_max_chars, 200);
    }

    #[test]
    fn test_flashcard_generation_is_low_temperature() {
        let config = AssistantConfig::default();
        let generation = config.flashcard_generation();
        assert!(generation.temperature <= 0.3);
        assert_eq!(generation.max_tokens, 1000);
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = AssistantConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AssistantConfig = serde_json::from_str(&json).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.chat.history_window, config.chat.history_window);
    }
}
