use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{ChatModel, Embedder};
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::LlmConfig;
use crate::core::errors::ApiError;

/// Client for any OpenAI-compatible `/chat/completions` + `/embeddings` API.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!(
                "No API key configured for {}; requests will be sent unauthenticated",
                config.base_url
            );
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            embedding_model: config.embedding_model.clone(),
            client,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder.send().await.map_err(ApiError::upstream)?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "{} returned {}: {}",
                path, status, text
            )));
        }

        res.json().await.map_err(ApiError::upstream)
    }
}

fn build_chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        if !request.tools.is_empty() {
            obj.insert("tools".to_string(), json!(request.tools));
            obj.insert("tool_choice".to_string(), json!("auto"));
        }
    }

    body
}

fn parse_chat_response(payload: Value) -> Result<ChatMessage, ApiError> {
    if let Some(usage) = payload.get("usage") {
        tracing::debug!(
            prompt_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0),
            completion_tokens = usage["completion_tokens"].as_u64().unwrap_or(0),
            "Chat completion usage"
        );
    }

    let message = payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .cloned()
        .ok_or_else(|| ApiError::Upstream("No choices in chat completion response".to_string()))?;

    let message: ChatMessage = serde_json::from_value(message)
        .map_err(|e| ApiError::Upstream(format!("Malformed chat completion message: {}", e)))?;

    match message {
        ChatMessage::Assistant { .. } => Ok(message),
        other => Err(ApiError::Upstream(format!(
            "Expected an assistant message, got role `{}`",
            other.role()
        ))),
    }
}

fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ApiError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| ApiError::Upstream("Embedding response has no data".to_string()))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        let vals = item["embedding"]
            .as_array()
            .ok_or_else(|| ApiError::Upstream("Embedding entry has no vector".to_string()))?;
        let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
        indexed.push((index, vec));
    }
    indexed.sort_by_key(|(index, _)| *index);

    if indexed.len() != expected {
        return Err(ApiError::Upstream(format!(
            "Expected {} embeddings, received {}",
            expected,
            indexed.len()
        )));
    }

    Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ChatMessage, ApiError> {
        let body = build_chat_body(&request, model_id);
        tracing::debug!(
            model = model_id,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling chat completion"
        );

        let payload = self.post_json("/chat/completions", &body).await?;
        parse_chat_response(payload)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Upstream("Embedding response was empty".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let payload = self.post_json("/embeddings", &body).await?;
        parse_embeddings(&payload, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{ModelConfig, ToolCallRequest, ToolDefinition};

    fn model_config() -> ModelConfig {
        ModelConfig {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    #[test]
    fn chat_body_includes_tools_only_when_present() {
        let tool = ToolDefinition::function("context_retrieval", "d", json!({"type": "object"}));
        let with_tools = ChatRequest::new(vec![ChatMessage::user("hi")])
            .with_tools(&[tool])
            .with_config(&model_config());
        let body = build_chat_body(&with_tools, "gpt-3.5-turbo");

        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "context_retrieval");
        assert_eq!(body["max_tokens"], 512);

        let plain = ChatRequest::new(vec![ChatMessage::user("hi")]).with_config(&model_config());
        let body = build_chat_body(&plain, "gpt-3.5-turbo");
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn parses_tool_call_response() {
        let payload = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "context_retrieval", "arguments": "{\"search_query\":\"ssm\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        });

        let message = parse_chat_response(payload).unwrap();
        assert_eq!(
            message.tool_calls(),
            &[ToolCallRequest::new("call_abc", "context_retrieval", "{\"search_query\":\"ssm\"}")]
        );
        assert_eq!(message.content(), None);
    }

    #[test]
    fn empty_choices_is_upstream_error() {
        let err = parse_chat_response(json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[test]
    fn embeddings_are_reordered_by_index() {
        let payload = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });

        let vectors = parse_embeddings(&payload, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn embedding_count_mismatch_is_rejected() {
        let payload = json!({"data": [{"index": 0, "embedding": [1.0]}]});
        assert!(parse_embeddings(&payload, 2).is_err());
    }
}
