//! On-disk encoding of a session history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEnvelope {
    pub format_version: u32,
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

pub fn encode(session_id: &str, messages: &[ChatMessage]) -> Result<Vec<u8>, ApiError> {
    let envelope = SessionEnvelope {
        format_version: FORMAT_VERSION,
        session_id: session_id.to_string(),
        saved_at: Utc::now(),
        messages: messages.to_vec(),
    };
    serde_json::to_vec_pretty(&envelope).map_err(ApiError::internal)
}

/// The version is checked before the body is interpreted, so a future
/// layout is reported as such instead of as a confusing field error.
pub fn decode(session_id: &str, bytes: &[u8]) -> Result<SessionEnvelope, ApiError> {
    let raw: Value = serde_json::from_slice(bytes).map_err(|e| {
        ApiError::Internal(format!("Session {} is not valid JSON: {}", session_id, e))
    })?;

    match raw.get("format_version").and_then(Value::as_u64) {
        Some(v) if v == u64::from(FORMAT_VERSION) => {}
        Some(v) => {
            return Err(ApiError::Internal(format!(
                "Session {} uses unsupported format_version {} (expected {})",
                session_id, v, FORMAT_VERSION
            )))
        }
        None => {
            return Err(ApiError::Internal(format!(
                "Session {} has no format_version",
                session_id
            )))
        }
    }

    serde_json::from_value(raw).map_err(|e| {
        ApiError::Internal(format!("Session {} could not be decoded: {}", session_id, e))
    })
}
