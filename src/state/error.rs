use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize session store: {0}")]
    Sessions(#[source] anyhow::Error),

    #[error("Failed to initialize vector index: {0}")]
    VectorIndex(#[source] anyhow::Error),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to register tools: {0}")]
    Tools(#[source] anyhow::Error),
}
