use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::parse_json_body;
use crate::conversation::ToolCallRecord;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    pub query: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Accepted for compatibility; retrieval is not filtered by document.
    #[serde(default)]
    pub doc_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ChatTurnResponse {
    pub response: String,
    pub chat_id: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// One conversational turn. The session is only written after the engine
/// succeeds, so a failed turn leaves the stored history as it was.
pub async fn chat_turn(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    let request: ChatTurnRequest = parse_json_body(&body)?;
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query cannot be empty".to_string()));
    }
    if let Some(doc_ids) = request.doc_ids.as_ref().filter(|ids| !ids.is_empty()) {
        tracing::debug!(?doc_ids, "Ignoring doc_ids filter");
    }

    let (chat_id, history) = match request.chat_id {
        Some(chat_id) => {
            let history = state.sessions.load_session(&chat_id).await?;
            (chat_id, history)
        }
        None => state.sessions.create_session(),
    };

    let outcome = state
        .engine
        .run_turn(query, history, &state.catalog, &state.model_config)
        .await?;

    state.sessions.save_session(&chat_id, &outcome.history).await?;
    tracing::info!(
        chat_id = %chat_id,
        tool_calls = outcome.tool_calls.len(),
        messages = outcome.history.len(),
        "Chat turn complete"
    );

    Ok(Json(ChatTurnResponse {
        response: outcome.answer(),
        chat_id,
        tool_calls: outcome.tool_calls,
    }))
}
