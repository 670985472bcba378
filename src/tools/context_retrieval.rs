use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::registry::{ToolHandler, ToolKind};
use crate::core::errors::ApiError;
use crate::llm::{Embedder, ToolDefinition};
use crate::rag::{build_context_prompt, VectorIndex};

pub const CONTEXT_RETRIEVAL_TOOL: &str = "context_retrieval";

const DESCRIPTION: &str = "This function lets you semantically retrieve relevant context chunks \
from a given document based on a query. Based on the original user query, write a good search \
query which is more logically sound to retrieve the relevant information from the document. You \
might even have to break down the user query into multiple search queries and call this function \
multiple times separately if there are multiple questions being asked in the original user query. \
This function returns the retrieved context chunks from the document based on the search query \
formatted as a string.";

pub fn definition() -> ToolDefinition {
    ToolDefinition::function(
        CONTEXT_RETRIEVAL_TOOL,
        DESCRIPTION,
        json!({
            "type": "object",
            "properties": {
                "search_query": {
                    "type": "string",
                    "description": "The sub-query to search for in the document."
                }
            },
            "required": ["search_query"]
        }),
    )
}

#[derive(Debug, Deserialize)]
struct ContextRetrievalArgs {
    search_query: String,
}

/// Embeds a sub-query and renders the nearest chunks as a context block.
/// Read-only with respect to the index.
pub struct ContextRetrievalTool {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl ContextRetrievalTool {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    pub async fn retrieve(&self, search_query: &str) -> Result<String, ApiError> {
        let search_query = search_query.trim();
        if search_query.is_empty() {
            return Err(ApiError::tool(CONTEXT_RETRIEVAL_TOOL, "search_query cannot be empty"));
        }

        let query_vector = self.embedder.embed(search_query).await?;
        let results = self.index.query(&query_vector, self.top_k, true).await?;
        tracing::debug!(
            search_query,
            matches = results.len(),
            "Retrieved context chunks"
        );

        Ok(build_context_prompt(&results))
    }
}

#[async_trait]
impl ToolHandler for ContextRetrievalTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ContextRetrieval
    }

    async fn invoke(&self, arguments: &Value) -> Result<String, ApiError> {
        let args: ContextRetrievalArgs = serde_json::from_value(arguments.clone())
            .map_err(|e| ApiError::tool(CONTEXT_RETRIEVAL_TOOL, format!("invalid arguments: {}", e)))?;
        self.retrieve(&args.search_query).await
    }
}
