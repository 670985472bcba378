pub mod chat;
pub mod documents;
pub mod health;
pub mod sessions;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::core::errors::ApiError;

/// Decodes a JSON request body so that malformed input is reported in the
/// same `{"response": ...}` shape as every other failure.
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e)))
}
