use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::chunker::TextChunker;
use super::store::{Metadata, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;
use crate::llm::Embedder;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub doc_id: String,
    pub chunks: usize,
}

/// Chunk -> embed -> upsert. Vector ids are `{doc_id}_{chunk_index}`, so
/// re-ingesting a document overwrites its earlier chunks in place.
#[derive(Clone)]
pub struct IngestionPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl IngestionPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
        }
    }

    pub async fn ingest_text(&self, doc_id: &str, text: &str) -> Result<IngestReport, ApiError> {
        let doc_id = doc_id.trim();
        if doc_id.is_empty() {
            return Err(ApiError::BadRequest("doc_id cannot be empty".to_string()));
        }

        let chunks = self.chunker.split(text);
        if chunks.is_empty() {
            tracing::warn!(doc_id, "Document has no text to index");
            return Ok(IngestReport {
                doc_id: doc_id.to_string(),
                chunks: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(ApiError::Upstream(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut metadata = Metadata::new();
                metadata.insert("text".to_string(), json!(chunk.text));
                metadata.insert("doc_id".to_string(), json!(doc_id));
                VectorRecord {
                    id: format!("{}_{}", doc_id, chunk.chunk_index),
                    vector,
                    metadata,
                }
            })
            .collect();

        let count = records.len();
        self.index.upsert_batch(records).await?;
        tracing::info!(doc_id, chunks = count, "Document ingested and indexed");

        Ok(IngestReport {
            doc_id: doc_id.to_string(),
            chunks: count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::InMemoryVectorIndex;
    use crate::testing::KeywordEmbedder;

    #[tokio::test]
    async fn upserts_one_vector_per_chunk_with_doc_metadata() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let pipeline = IngestionPipeline::new(
            TextChunker::new(40, 5),
            Arc::new(KeywordEmbedder::default()),
            index.clone(),
        );

        let text = "Transformers use attention. Mamba uses a selective state-space model. ";
        let report = pipeline.ingest_text("mamba.pdf", text).await.unwrap();

        assert!(report.chunks >= 2);
        assert_eq!(index.count().await.unwrap(), report.chunks);

        let results = index.query(&[0.0; 4], 10, true).await.unwrap();
        assert!(results.iter().any(|r| r.id == "mamba.pdf_0"));
        assert!(results
            .iter()
            .all(|r| r.metadata.as_ref().unwrap()["doc_id"] == "mamba.pdf"));
    }

    #[tokio::test]
    async fn blank_doc_id_is_rejected() {
        let pipeline = IngestionPipeline::new(
            TextChunker::new(40, 5),
            Arc::new(KeywordEmbedder::default()),
            Arc::new(InMemoryVectorIndex::new()),
        );

        let err = pipeline.ingest_text("  ", "text").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn empty_document_indexes_nothing() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let pipeline = IngestionPipeline::new(
            TextChunker::new(40, 5),
            Arc::new(KeywordEmbedder::default()),
            index.clone(),
        );

        let report = pipeline.ingest_text("empty", "").await.unwrap();
        assert_eq!(report.chunks, 0);
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
