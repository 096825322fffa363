//! Flashcard generation and the review deck
//!
//! A finished question/answer exchange can be distilled into study cards by a
//! second, constrained completion call: low temperature, no tools, and a
//! prompt that demands a bare JSON array of {front, back} objects. Model
//! output is still treated as untrusted prose and parsed through
//! [`extract_json_array`]; a failed generation never touches the deck a
//! caller already holds.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::structured_output::{extract_json_array, ExtractError};
use crate::llm::{ChatMessage, ChatResponse, CompletionProvider, GenerationConfig};

/// System prompt for the constrained generation call.
pub const FLASHCARD_SYSTEM_PROMPT: &str =
    "You are a flashcard creator. Create educational flashcards in JSON format.";

/// One study card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

// ==================== Deck ====================

/// An ordered deck of cards with a cursor for card-by-card review.
#[derive(Debug, Clone, Default)]
pub struct FlashcardDeck {
    cards: Vec<Flashcard>,
    cursor: usize,
}

impl FlashcardDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole deck and reset the cursor to the first card.
    /// Partial updates are deliberately not offered: a deck is either the
    /// result of one successful generation or untouched.
    pub fn replace_all(&mut self, cards: Vec<Flashcard>) {
        self.cards = cards;
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.cursor)
    }

    /// 1-based position of the current card, 0 on an empty deck. Pairs with
    /// [`len`](Self::len) for "Card X of Y" displays.
    pub fn position(&self) -> usize {
        if self.cards.is_empty() {
            0
        } else {
            self.cursor + 1
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    /// Advance the cursor, wrapping past the last card.
    pub fn next_card(&mut self) {
        if !self.cards.is_empty() {
            self.cursor = (self.cursor + 1) % self.cards.len();
        }
    }

    /// Step the cursor back, wrapping before the first card.
    pub fn prev_card(&mut self) {
        if !self.cards.is_empty() {
            self.cursor = (self.cursor + self.cards.len() - 1) % self.cards.len();
        }
    }

    /// Write the deck to `dir` as a pretty-printed JSON array of
    /// {front, back} objects. Returns the path of the written file.
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        let filename = format!("flashcards_{}.json", Local::now().format("%Y%m%d_%H%M"));
        let path = dir.join(filename);

        let json = serde_json::to_string_pretty(&self.cards)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write flashcard export to {}", path.display()))?;

        info!(path = %path.display(), count = self.cards.len(), "Exported flashcards");
        Ok(path)
    }
}

// ==================== Generation ====================

/// Parse a model response into cards. Accepts prose-wrapped output; rejects
/// arrays whose entries are missing either face.
pub fn parse_flashcards(response: &str) -> Result<Vec<Flashcard>, ExtractError> {
    let array = extract_json_array(response)?;
    serde_json::from_str::<Vec<Flashcard>>(&array)
        .map_err(|e| ExtractError::Malformed(e.to_string()))
}

/// Ask the model to turn a question/answer pair into 3-5 study cards.
///
/// The call carries no tools and should run at a low temperature; the caller
/// decides what to do with the cards (typically [`FlashcardDeck::replace_all`]
/// on success and a visible warning on failure, leaving the previous deck
/// alone).
pub async fn generate_flashcards(
    provider: &dyn CompletionProvider,
    config: &GenerationConfig,
    question: &str,
    answer: &str,
) -> Result<Vec<Flashcard>> {
    let prompt = format!(
        "Based on the following question and answer, create 3-5 educational flashcards.\n\
         Each flashcard should have a clear concept on the front and detailed explanation on the back.\n\
         Format as JSON array of objects with 'front' and 'back' keys.\n\
         Question: {}\n\
         Answer: {}\n\
         Flashcards (JSON format):",
        question, answer
    );

    let messages = vec![
        ChatMessage::system(FLASHCARD_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ];

    let response = provider.chat(&messages, &[], config).await?;
    let text = match response {
        ChatResponse::Content(text) => text,
        ChatResponse::ToolCalls(_) => {
            return Err(anyhow!(
                "Flashcard generation returned tool calls instead of text"
            ))
        }
    };

    debug!(response_len = text.len(), "Parsing flashcard response");
    let cards = parse_flashcards(&text).map_err(|e| anyhow!("{}", e))?;

    info!(count = cards.len(), "Generated flashcards");
    Ok(cards)
}
