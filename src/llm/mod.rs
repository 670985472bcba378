pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiClient;
pub use provider::{ChatModel, Embedder};
pub use types::{ChatMessage, ChatRequest, ModelConfig, ToolCallRequest, ToolDefinition};
