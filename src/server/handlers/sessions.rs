use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.sessions.load_session(&chat_id).await?;
    Ok(Json(json!({
        "chat_id": chat_id,
        "messages": messages,
    })))
}
