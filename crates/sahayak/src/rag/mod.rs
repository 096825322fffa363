//! Study aids layered on top of chat turns - structured extraction of JSON
//! payloads from free-form model output, and flashcard generation built on it.

pub mod flashcards;
pub mod structured_output;

// Re-export commonly used types
pub use flashcards::{
    generate_flashcards, parse_flashcards, Flashcard, FlashcardDeck, FLASHCARD_SYSTEM_PROMPT,
};
pub use structured_output::{extract_json_array, ExtractError};
