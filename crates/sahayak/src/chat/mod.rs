//! Turn orchestration.
//!
//! The engine drives one conversation turn end to end: record the user
//! message, assemble context, offer tools on the first completion attempt,
//! execute requested calls, then force a natural-language synthesis pass.

pub mod engine;

pub use engine::{
    ChatEngine, EngineConfig, DEFAULT_SYSTEM_PROMPT, NO_ANSWER_FALLBACK, RATE_LIMIT_MESSAGE,
};
