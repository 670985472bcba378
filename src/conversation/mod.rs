pub mod engine;
pub mod prompt;

pub use engine::{ConversationEngine, ToolCallRecord, TurnOutcome, TurnState};
pub use prompt::SYSTEM_PROMPT;
