//! Session state - the per-conversation context a caller owns
//!
//! One session bundles the bounded transcript and the flashcard deck for one
//! conversation. The engine borrows a session per turn and never stores
//! sessions itself; callers decide lifetime and isolation (typically one
//! session per user or per REPL run). Nothing in here is shared or locked.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::memory::{ConversationMemory, DEFAULT_CAPACITY};
use crate::rag::FlashcardDeck;

/// Caller-owned state for one conversation.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stable id for logging and correlation.
    pub id: Uuid,

    /// When the session was opened.
    pub started_at: DateTime<Utc>,

    /// Bounded conversation log.
    pub memory: ConversationMemory,

    /// Cards generated during this session.
    pub flashcards: FlashcardDeck,
}

impl Session {
    /// Open a session with the default memory capacity.
    pub fn new() -> Self {
        Self::with_memory_capacity(DEFAULT_CAPACITY)
    }

    /// Open a session retaining at most `capacity` messages.
    pub fn with_memory_capacity(capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            memory: ConversationMemory::new(capacity),
            flashcards: FlashcardDeck::new(),
        }
    }

    /// Drop the transcript and the deck while keeping the session identity.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.flashcards.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use crate::rag::Flashcard;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.memory.is_empty());
        assert!(session.flashcards.is_empty());
        assert_eq!(session.memory.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let mut a = Session::new();
        let b = Session::new();

        a.memory.add(ChatMessage::user("only in a"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.memory.len(), 1);
        assert!(b.memory.is_empty());
    }

    #[test]
    fn test_reset_clears_state_but_keeps_identity() {
        let mut session = Session::with_memory_capacity(5);
        let id = session.id;

        session.memory.add(ChatMessage::user("hello"));
        session.flashcards.replace_all(vec![Flashcard {
            front: "Q".to_string(),
            back: "A".to_string(),
        }]);

        session.reset();
        assert_eq!(session.id, id);
        assert!(session.memory.is_empty());
        assert!(session.flashcards.is_empty());
        assert_eq!(session.memory.capacity(), 5);
    }
}
