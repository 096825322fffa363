//! Agent-side building blocks: the caller-owned session, the tool seam and
//! the concrete lookup tools.

pub mod context;
pub mod tools;
pub mod travel_tools;

pub use context::Session;
pub use tools::{AssistantTool, ToolRegistry};
