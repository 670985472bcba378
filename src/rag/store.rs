//! VectorIndex trait: abstract interface for vector storage backends.
//!
//! The conversation side only ever queries; ingestion only ever upserts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

/// Metadata stored alongside a vector. Must carry a `text` field for the
/// record to contribute to retrieved context.
pub type Metadata = Map<String, Value>;

/// A vector ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

/// One match from a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    /// Similarity score (higher = better).
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a vector by id.
    async fn upsert(&self, id: &str, vector: Vec<f32>, metadata: Metadata)
        -> Result<(), ApiError>;

    /// Insert or replace several vectors.
    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), ApiError> {
        for record in records {
            self.upsert(&record.id, record.vector, record.metadata).await?;
        }
        Ok(())
    }

    /// Return at most `top_k` matches, best first. Never returns more
    /// matches than the index holds.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalResult>, ApiError>;

    /// Number of stored vectors.
    async fn count(&self) -> Result<usize, ApiError>;
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Best score first; ties broken by id so identical index state always
/// yields identical ordering.
pub(crate) fn rank(mut scored: Vec<RetrievalResult>, top_k: usize) -> Vec<RetrievalResult> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.truncate(top_k);
    scored
}
