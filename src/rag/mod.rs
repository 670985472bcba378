//! Retrieval side of the pipeline.
//!
//! This module provides:
//! - `VectorIndex`: storage abstraction with SQLite, Upstash, and in-memory backends
//! - `TextChunker` / `IngestionPipeline`: document text -> embedded, upserted chunks
//! - `build_context_prompt`: renders query matches into a context block

mod chunker;
mod context_builder;
mod ingest;
mod memory;
mod sqlite;
mod store;
mod upstash;

pub use chunker::{TextChunk, TextChunker};
pub use context_builder::{build_context_prompt, CONTEXT_SEPARATOR};
pub use ingest::{IngestReport, IngestionPipeline};
pub use memory::InMemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;
pub use store::{Metadata, RetrievalResult, VectorIndex, VectorRecord};
pub use upstash::UpstashVectorIndex;
