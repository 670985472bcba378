//! Upstash Vector REST backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::store::{Metadata, RetrievalResult, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct UpstashVectorIndex {
    base_url: String,
    token: String,
    client: Client,
}

#[derive(Deserialize)]
struct UpstashEnvelope<T> {
    result: Option<T>,
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstashInfo {
    vector_count: u64,
}

impl UpstashVectorIndex {
    pub fn new(base_url: &str, token: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let builder = match body {
            Some(body) => self.client.post(&url).json(&body),
            None => self.client.get(&url),
        };

        let res = builder
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Upstash {} returned {}: {}",
                path, status, text
            )));
        }

        let envelope: UpstashEnvelope<T> = res.json().await.map_err(ApiError::upstream)?;
        unwrap_envelope(path, envelope)
    }
}

fn unwrap_envelope<T>(path: &str, envelope: UpstashEnvelope<T>) -> Result<T, ApiError> {
    if let Some(error) = envelope.error {
        return Err(ApiError::Upstream(format!("Upstash {}: {}", path, error)));
    }
    envelope
        .result
        .ok_or_else(|| ApiError::Upstream(format!("Upstash {} returned no result", path)))
}

fn record_json(record: &VectorRecord) -> Value {
    json!({
        "id": record.id,
        "vector": record.vector,
        "metadata": record.metadata,
    })
}

#[async_trait]
impl VectorIndex for UpstashVectorIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<(), ApiError> {
        let record = VectorRecord {
            id: id.to_string(),
            vector,
            metadata,
        };
        self.upsert_batch(vec![record]).await
    }

    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let body = Value::Array(records.iter().map(record_json).collect());
        let _: Value = self.call("/upsert", Some(body)).await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalResult>, ApiError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": include_metadata,
            "includeVectors": false,
        });
        let mut results: Vec<RetrievalResult> = self.call("/query", Some(body)).await?;
        results.truncate(top_k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let info: UpstashInfo = self.call("/info", None).await?;
        Ok(info.vector_count as usize)
    }
}
