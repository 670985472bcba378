use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{cosine_similarity, rank, Metadata, RetrievalResult, VectorIndex};
use crate::core::errors::ApiError;

/// Process-local index; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<BTreeMap<String, (Vec<f32>, Metadata)>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<(), ApiError> {
        self.entries
            .write()
            .await
            .insert(id.to_string(), (vector, metadata));
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalResult>, ApiError> {
        let entries = self.entries.read().await;
        let scored = entries
            .iter()
            .map(|(id, (stored, metadata))| RetrievalResult {
                id: id.clone(),
                score: cosine_similarity(vector, stored),
                metadata: include_metadata.then(|| metadata.clone()),
            })
            .collect();

        Ok(rank(scored, top_k))
    }

    async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.entries.read().await.len())
    }
}
