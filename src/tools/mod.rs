pub mod context_retrieval;
pub mod registry;

pub use context_retrieval::{ContextRetrievalTool, CONTEXT_RETRIEVAL_TOOL};
pub use registry::{ToolHandler, ToolKind, ToolRegistry};
