//! SQLite-backed vector index.
//!
//! In-process store using SQLite for vectors and metadata and
//! brute-force cosine similarity for queries.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{cosine_similarity, rank, Metadata, RetrievalResult, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn serialize_metadata(metadata: &Metadata) -> Result<String, ApiError> {
        serde_json::to_string(metadata).map_err(ApiError::internal)
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<(), ApiError> {
        let blob = Self::serialize_embedding(&vector);
        let metadata_str = Self::serialize_metadata(&metadata)?;

        sqlx::query(
            "INSERT OR REPLACE INTO vectors (id, metadata, embedding, updated_at)
             VALUES (?1, ?2, ?3, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(id)
        .bind(&metadata_str)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(ApiError::upstream)?;

        Ok(())
    }

    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::upstream)?;

        for record in &records {
            let blob = Self::serialize_embedding(&record.vector);
            let metadata_str = Self::serialize_metadata(&record.metadata)?;

            sqlx::query(
                "INSERT OR REPLACE INTO vectors (id, metadata, embedding, updated_at)
                 VALUES (?1, ?2, ?3, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            )
            .bind(&record.id)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::upstream)?;
        }

        tx.commit().await.map_err(ApiError::upstream)?;
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

        let rows = sqlx::query("SELECT id, metadata, embedding FROM vectors")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::upstream)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let embedding_bytes: Vec<u8> = row.get("embedding");
            if embedding_bytes.is_empty() {
                continue;
            }
            let id: String = row.get("id");
            let stored = Self::deserialize_embedding(&embedding_bytes);
            let metadata = if include_metadata {
                let raw: String = row.get("metadata");
                let parsed = serde_json::from_str::<Metadata>(&raw).map_err(|e| {
                    ApiError::Internal(format!("corrupt metadata for vector {}: {}", id, e))
                })?;
                Some(parsed)
            } else {
                None
            };

            scored.push(RetrievalResult {
                score: cosine_similarity(vector, &stored),
                id,
                metadata,
            });
        }

        Ok(rank(scored, top_k))
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::upstream)?;
        Ok(count.max(0) as usize)
    }
}
