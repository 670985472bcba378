use async_trait::async_trait;

use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::ApiError;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming); always yields an assistant message
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ChatMessage, ApiError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// embed a single text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;

    /// embed several texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
