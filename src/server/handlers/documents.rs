use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::parse_json_body;
use crate::core::errors::ApiError;
use crate::rag::IngestReport;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestDocumentRequest {
    pub doc_id: String,
    pub text: String,
}

pub async fn ingest_document(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngestReport>, ApiError> {
    let request: IngestDocumentRequest = parse_json_body(&body)?;
    let report = state
        .ingestion
        .ingest_text(&request.doc_id, &request.text)
        .await?;
    Ok(Json(report))
}
