use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use paperchat_backend::core::config::{AppPaths, ConfigService};
use paperchat_backend::core::logging;
use paperchat_backend::llm::OpenAiClient;
use paperchat_backend::rag::{IngestionPipeline, TextChunker};
use paperchat_backend::state::open_vector_index;

/// Chunk, embed, and index text or markdown documents.
#[derive(Parser)]
#[command(name = "paperchat-ingest", version)]
struct Cli {
    /// Documents to index; each file's stem becomes its doc_id
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Override the doc_id (only valid with a single file)
    #[arg(long)]
    doc_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.doc_id.is_some() && cli.files.len() > 1 {
        bail!("--doc-id can only be used with a single file");
    }

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "info");

    let config = ConfigService::new(paths.clone())
        .load_config()
        .context("Failed to load configuration")?;
    let embedder = Arc::new(OpenAiClient::new(&config.llm)?);
    let index = open_vector_index(&paths, &config).await?;
    let pipeline = IngestionPipeline::new(
        TextChunker::from_config(&config.ingestion),
        embedder,
        index.clone(),
    );

    for file in &cli.files {
        let doc_id = match &cli.doc_id {
            Some(doc_id) => doc_id.clone(),
            None => doc_id_for(file)?,
        };
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let report = pipeline
            .ingest_text(&doc_id, &text)
            .await
            .with_context(|| format!("Failed to ingest {}", file.display()))?;
        println!("{}: {} chunks", report.doc_id, report.chunks);
    }

    tracing::info!(vectors = index.count().await?, "Ingestion finished");
    Ok(())
}

fn doc_id_for(file: &Path) -> anyhow::Result<String> {
    file.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a doc_id from {}", file.display()))
}
