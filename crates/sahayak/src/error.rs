//! Turn-level failure taxonomy.
//!
//! Every recovery is local to a turn: failures become user-visible text, not
//! process aborts. Display forms double as the exact wording the engine
//! records in memory, so renderers print variants as-is.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// HTTP or provider failure on a completion request. Converted to a
    /// visible assistant message; never retried.
    #[error("Language model request failed: {0}")]
    Network(String),

    /// Tool-call arguments that are not valid JSON. Aborts the current turn
    /// before any tool runs.
    #[error("Could not parse tool arguments: {0}")]
    Parse(String),

    /// The model requested a tool the registry does not know.
    #[error("Unknown tool requested: {0}")]
    UnknownTool(String),

    /// An API key is absent. Raised at startup or first use with an explicit
    /// message, never silently degraded.
    #[error("Missing credential: {0}")]
    MissingCredential(String),
}
