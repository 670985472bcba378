use std::sync::Arc;

use crate::conversation::{ConversationEngine, SYSTEM_PROMPT};
use crate::core::config::{AppConfig, AppPaths, SessionBackend, VectorIndexBackend};
use crate::history::{FsObjectStore, MemoryObjectStore, ObjectStore, SessionStore, SqliteObjectStore};
use crate::llm::{ChatModel, Embedder, ModelConfig, OpenAiClient, ToolDefinition};
use crate::rag::{
    InMemoryVectorIndex, IngestionPipeline, SqliteVectorIndex, TextChunker, UpstashVectorIndex,
    VectorIndex,
};
use crate::tools::{ContextRetrievalTool, ToolHandler, ToolRegistry};

pub mod error;

use error::InitializationError;

/// Shared application state handed to every route.
///
/// Everything in here is built once at startup and never mutated; per-chat
/// state lives in the session store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: ConversationEngine,
    pub sessions: SessionStore,
    pub ingestion: IngestionPipeline,
    pub catalog: Vec<ToolDefinition>,
    pub model_config: ModelConfig,
}

impl AppState {
    /// Builds the real clients and stores selected by `config`.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let client = Arc::new(
            OpenAiClient::new(&config.llm).map_err(|e| InitializationError::Llm(e.into()))?,
        );
        let index = open_vector_index(&paths, &config).await?;
        let objects = open_object_store(&paths, &config).await?;

        tracing::info!(
            model = %config.llm.chat_model,
            embedding_model = %config.llm.embedding_model,
            vector_index = ?config.vector_index.backend,
            sessions = ?config.sessions.backend,
            "Application state initialized"
        );

        let state = Self::new(config, client.clone(), client, index, objects)?;
        Ok(Arc::new(state))
    }

    /// Wires already-constructed collaborators together.
    pub fn new(
        config: AppConfig,
        model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self, InitializationError> {
        let retrieval: Arc<dyn ToolHandler> = Arc::new(ContextRetrievalTool::new(
            embedder.clone(),
            index.clone(),
            config.retrieval.top_k,
        ));
        let registry =
            ToolRegistry::new(vec![retrieval]).map_err(|e| InitializationError::Tools(e.into()))?;
        let catalog = registry.catalog();
        registry
            .validate_catalog(&catalog)
            .map_err(|e| InitializationError::Tools(e.into()))?;

        let sessions = SessionStore::new(objects, config.sessions.prefix.clone(), SYSTEM_PROMPT);
        let ingestion = IngestionPipeline::new(
            TextChunker::from_config(&config.ingestion),
            embedder,
            index,
        );
        let model_config = ModelConfig::from_llm_config(&config.llm);

        Ok(Self {
            config: Arc::new(config),
            engine: ConversationEngine::new(model, registry),
            sessions,
            ingestion,
            catalog,
            model_config,
        })
    }
}

pub async fn open_vector_index(
    paths: &AppPaths,
    config: &AppConfig,
) -> Result<Arc<dyn VectorIndex>, InitializationError> {
    let settings = &config.vector_index;
    let index: Arc<dyn VectorIndex> = match settings.backend {
        VectorIndexBackend::Sqlite => Arc::new(
            SqliteVectorIndex::with_path(paths.vector_db_path.clone())
                .await
                .map_err(|e| InitializationError::VectorIndex(e.into()))?,
        ),
        VectorIndexBackend::Upstash => {
            let (Some(url), Some(token)) = (settings.url.as_deref(), settings.token.as_deref())
            else {
                return Err(InitializationError::VectorIndex(anyhow::anyhow!(
                    "upstash backend requires vector_index.url and vector_index.token"
                )));
            };
            Arc::new(
                UpstashVectorIndex::new(url, token, config.llm.request_timeout_secs)
                    .map_err(|e| InitializationError::VectorIndex(e.into()))?,
            )
        }
        VectorIndexBackend::Memory => {
            tracing::warn!("Using in-memory vector index; indexed documents are lost on restart");
            Arc::new(InMemoryVectorIndex::new())
        }
    };
    Ok(index)
}

pub async fn open_object_store(
    paths: &AppPaths,
    config: &AppConfig,
) -> Result<Arc<dyn ObjectStore>, InitializationError> {
    let store: Arc<dyn ObjectStore> = match config.sessions.backend {
        SessionBackend::Filesystem => Arc::new(FsObjectStore::new(paths.sessions_dir.clone())),
        SessionBackend::Sqlite => Arc::new(
            SqliteObjectStore::new(paths.sessions_db_path.clone())
                .await
                .map_err(|e| InitializationError::Sessions(e.into()))?,
        ),
        SessionBackend::Memory => {
            tracing::warn!("Using in-memory session store; chats are lost on restart");
            Arc::new(MemoryObjectStore::new())
        }
    };
    Ok(store)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_backends_open_under_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().join("data"));
        let config = AppConfig::default();

        let index = open_vector_index(&paths, &config).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(paths.vector_db_path.exists());

        let objects = open_object_store(&paths, &config).await.unwrap();
        assert_eq!(objects.get("paper_chat/chat_x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upstash_without_credentials_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().join("data"));
        let mut config = AppConfig::default();
        config.vector_index.backend = VectorIndexBackend::Upstash;

        let result = open_vector_index(&paths, &config).await;
        assert!(matches!(result, Err(InitializationError::VectorIndex(_))));
    }
}
