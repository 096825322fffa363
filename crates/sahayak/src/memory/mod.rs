//! Per-session conversation memory.
//!
//! A bounded, ordered log of role-tagged messages. Insertion appends;
//! overflow evicts oldest entries first (a plain sliding window, not
//! relevance-based); entries are never reordered or mutated once added.
//! One session owns one memory and accesses it from one thread, so there is
//! no lock here.

use crate::llm::ChatMessage;

/// Default retained-message count per session.
pub const DEFAULT_CAPACITY: usize = 15;

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
    capacity: usize,
}

impl ConversationMemory {
    /// Create a memory retaining at most `capacity` messages. The config
    /// layer rejects a zero capacity before one is ever constructed.
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, dropping oldest entries once over capacity.
    pub fn add(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() > self.capacity {
            let overflow = self.messages.len() - self.capacity;
            self.messages.drain(..overflow);
        }
    }

    /// The full retained sequence in chronological order.
    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The last `n` retained messages (fewer if the log is shorter), used
    /// when serializing recent context into the system prompt.
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
