use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::defaults::default_local_origins;
use crate::server::handlers::{chat, documents, health, sessions};
use crate::state::AppState;

/// Creates the application router with CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat", post(chat::chat_turn))
        .route("/api/documents", post(documents::ingest_document))
        .route("/api/sessions/:chat_id", get(sessions::get_session))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(&state.config.server.cors_allowed_origins)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core::errors::ApiError;
    use crate::history::FsObjectStore;
    use crate::llm::{ChatMessage, ToolCallRequest};
    use crate::state::test_support::state_with_objects;
    use crate::testing::{retrieval_call, ScriptedModel};

    /// Sessions are written under the returned tempdir so tests can list them.
    fn test_state(model: Arc<ScriptedModel>) -> (Arc<AppState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let objects = Arc::new(FsObjectStore::new(dir.path()));
        (Arc::new(state_with_objects(model, objects)), dir)
    }

    fn stored_sessions(dir: &tempfile::TempDir) -> Vec<String> {
        match std::fs::read_dir(dir.path().join("paper_chat")) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn saved_session(state: &AppState) -> String {
        let (chat_id, history) = state.sessions.create_session();
        state.sessions.save_session(&chat_id, &history).await.unwrap();
        chat_id
    }

    fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (state, _dir) = test_state(ScriptedModel::replying(Vec::new()));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn first_turn_creates_and_persists_a_session() {
        let model = ScriptedModel::replying(vec![ChatMessage::assistant("Hello!")]);
        let (state, dir) = test_state(model);

        let (status, body) = send(&state, post_json("/api/chat", r#"{"query": "Hi"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Hello!");
        assert_eq!(body["tool_calls"], json!([]));

        let chat_id = body["chat_id"].as_str().unwrap().to_string();
        assert!(chat_id.starts_with("chat_"));
        assert_eq!(stored_sessions(&dir), vec![format!("{}.json", chat_id)]);

        let request = Request::builder()
            .uri(format!("/api/sessions/{}", chat_id))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["content"], "Hello!");
    }

    #[tokio::test]
    async fn follow_up_turn_extends_existing_history() {
        let model = ScriptedModel::replying(vec![
            ChatMessage::assistant_tool_calls(vec![retrieval_call("call_1", "mamba")]),
            ChatMessage::assistant("Mamba is a state-space model."),
        ]);
        let (state, _dir) = test_state(model.clone());
        let chat_id = saved_session(&state).await;

        let body = json!({"query": "What is Mamba?", "chat_id": chat_id, "doc_ids": ["mamba.pdf"]});
        let (status, body) = send(&state, post_json("/api/chat", body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chat_id"], chat_id.as_str());
        assert_eq!(
            body["tool_calls"],
            json!([{"context_retrieval": {"search_query": "mamba"}}])
        );
        assert_eq!(state.sessions.load_session(&chat_id).await.unwrap().len(), 5);
        assert_eq!(model.requests().len(), 2);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_before_any_work() {
        let model = ScriptedModel::replying(vec![ChatMessage::assistant("unused")]);
        let (state, dir) = test_state(model.clone());

        let (status, body) = send(&state, post_json("/api/chat", "{\"query\": ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["response"]
            .as_str()
            .unwrap()
            .contains("invalid request body"));
        assert!(model.requests().is_empty());
        assert!(stored_sessions(&dir).is_empty());
    }

    #[tokio::test]
    async fn missing_or_blank_query_is_a_bad_request() {
        let (state, dir) = test_state(ScriptedModel::replying(Vec::new()));

        let (status, body) = send(&state, post_json("/api/chat", r#"{"chat_id": null}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["response"].as_str().unwrap().contains("query"));

        let (status, _) = send(&state, post_json("/api/chat", r#"{"query": "   "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(stored_sessions(&dir).is_empty());
    }

    #[tokio::test]
    async fn unknown_chat_id_is_not_found() {
        let (state, _dir) = test_state(ScriptedModel::replying(Vec::new()));

        let body = r#"{"query": "Hi", "chat_id": "chat_does_not_exist"}"#;
        let (status, body) = send(&state, post_json("/api/chat", body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["response"]
            .as_str()
            .unwrap()
            .contains("chat_does_not_exist"));
    }

    #[tokio::test]
    async fn failed_turn_leaves_stored_history_untouched() {
        let model = ScriptedModel::replying(vec![ChatMessage::assistant_tool_calls(vec![
            ToolCallRequest::new("call_1", "web_search", "{}"),
        ])]);
        let (state, _dir) = test_state(model);
        let chat_id = saved_session(&state).await;

        let body = json!({"query": "Hi", "chat_id": chat_id});
        let (status, body) = send(&state, post_json("/api/chat", body.to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["response"].as_str().unwrap().contains("web_search"));
        assert_eq!(state.sessions.load_session(&chat_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_first_turn_stores_no_session() {
        let model = ScriptedModel::new(vec![Err(ApiError::Upstream("model unavailable".into()))]);
        let (state, dir) = test_state(model);

        let (status, _) = send(&state, post_json("/api/chat", r#"{"query": "Hi"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(stored_sessions(&dir).is_empty());
    }

    #[tokio::test]
    async fn failed_first_tool_round_stores_no_session() {
        let model = ScriptedModel::replying(vec![ChatMessage::assistant_tool_calls(vec![
            ToolCallRequest::new("call_1", "web_search", "{}"),
        ])]);
        let (state, dir) = test_state(model);

        let (status, _) = send(&state, post_json("/api/chat", r#"{"query": "Hi"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(stored_sessions(&dir).is_empty());
    }

    #[tokio::test]
    async fn documents_are_chunked_into_the_index() {
        let (state, _dir) = test_state(ScriptedModel::replying(Vec::new()));

        let body = json!({"doc_id": "mamba.pdf", "text": "Mamba is a selective state-space model."});
        let (status, body) = send(&state, post_json("/api/documents", body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"doc_id": "mamba.pdf", "chunks": 1}));
    }

    #[test]
    fn blank_origins_fall_back_to_local_defaults() {
        let origins = resolve_allowed_origins(&["  ".to_string()]);
        assert_eq!(origins, default_local_origins());

        let origins = resolve_allowed_origins(&["https://paperchat.example".to_string()]);
        assert_eq!(origins, vec!["https://paperchat.example".to_string()]);
    }
}
