//! Deterministic doubles for the external collaborators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, Embedder, ToolCallRequest};
use crate::tools::{ToolHandler, ToolKind};

/// Bag-of-keywords embedding: one dimension per keyword plus a small bias
/// so no vector is all zeros.
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self {
            keywords: vec!["state-space", "attention", "mamba", "dependencies", "transformer"],
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.1);
        Ok(vector)
    }
}

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ChatMessage, ApiError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<ChatMessage, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(messages: Vec<ChatMessage>) -> Arc<Self> {
        Self::new(messages.into_iter().map(Ok).collect())
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<ChatMessage, ApiError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Upstream("script exhausted".to_string())))
    }
}

/// Stands in for `context_retrieval`, echoing the search query back.
#[derive(Default)]
pub struct EchoTool {
    calls: Mutex<Vec<Value>>,
}

impl EchoTool {
    pub fn shared() -> Arc<dyn ToolHandler> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolHandler for EchoTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ContextRetrieval
    }

    async fn invoke(&self, arguments: &Value) -> Result<String, ApiError> {
        self.calls.lock().unwrap().push(arguments.clone());
        let query = arguments["search_query"].as_str().unwrap_or_default();
        Ok(format!("echo: {}", query))
    }
}

/// Always fails, as a broken retrieval backend would.
pub struct FailingTool;

#[async_trait]
impl ToolHandler for FailingTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ContextRetrieval
    }

    async fn invoke(&self, _arguments: &Value) -> Result<String, ApiError> {
        Err(ApiError::tool("context_retrieval", "index unavailable"))
    }
}

pub fn retrieval_call(id: &str, search_query: &str) -> ToolCallRequest {
    ToolCallRequest::new(
        id,
        "context_retrieval",
        serde_json::json!({ "search_query": search_query }).to_string(),
    )
}
