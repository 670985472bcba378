pub mod codec;
pub mod object_store;

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;

pub use object_store::{FsObjectStore, MemoryObjectStore, ObjectStore, SqliteObjectStore};

/// Persists whole chat histories, one blob per session under
/// `{prefix}/{session_id}`.
#[derive(Clone)]
pub struct SessionStore {
    objects: Arc<dyn ObjectStore>,
    prefix: String,
    system_prompt: String,
}

impl SessionStore {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            prefix: prefix.into(),
            system_prompt: system_prompt.into(),
        }
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}/{}", self.prefix, session_id)
    }

    /// Fresh id and a history holding only the system message. Nothing is
    /// written until the first `save_session`, so a turn that fails leaves
    /// no orphaned session behind.
    pub fn create_session(&self) -> (String, Vec<ChatMessage>) {
        let session_id = format!("chat_{}", uuid::Uuid::new_v4());
        let history = vec![ChatMessage::system(self.system_prompt.clone())];
        tracing::info!(session_id = %session_id, "Started chat session");
        (session_id, history)
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        validate_session_id(session_id)?;
        let bytes = self
            .objects
            .get(&self.key(session_id))
            .await?
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        let envelope = codec::decode(session_id, &bytes)?;
        tracing::debug!(
            session_id,
            messages = envelope.messages.len(),
            saved_at = %envelope.saved_at,
            "Loaded chat session"
        );
        Ok(envelope.messages)
    }

    pub async fn save_session(
        &self,
        session_id: &str,
        history: &[ChatMessage],
    ) -> Result<(), ApiError> {
        validate_session_id(session_id)?;
        validate_history(history)?;

        let bytes = codec::encode(session_id, history)?;
        self.objects.put(&self.key(session_id), bytes).await?;
        tracing::debug!(session_id, messages = history.len(), "Saved chat session");
        Ok(())
    }
}

fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    let valid = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid chat_id: {:?}", session_id)))
    }
}

fn validate_history(history: &[ChatMessage]) -> Result<(), ApiError> {
    let leading_system = history.first().map(ChatMessage::is_system).unwrap_or(false);
    let system_count = history.iter().filter(|m| m.is_system()).count();
    if !leading_system || system_count != 1 {
        return Err(ApiError::Internal(
            "session history must start with exactly one system message".to_string(),
        ));
    }
    Ok(())
}
