//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::types::{
    ChatRequest, ErrorResponse, PageInfo, SessionResponse, SessionView, SuccessResponse,
};
use super::AppState;
use crate::engine::EngineError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the chat page
        .route("/", get(serve_page))
        // Static assets
        .route("/assets/*path", get(serve_static))
        // Page metadata
        .route("/api/page", get(page_info))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/close", post(close_session))
        // Chat turn
        .route("/api/sessions/:id/chat", post(send_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_page() -> Response {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - chat page not found</h1>".to_string()),
        )
            .into_response(),
    }
}

async fn page_info(State(state): State<AppState>) -> Json<PageInfo> {
    Json(state.page.as_ref().clone())
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let (_, handle) = state.sessions.create().await;
    let session = handle.lock().await;

    Json(SessionResponse {
        session: SessionView::from(&*session),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::session_not_found(&id))?;
    let session = handle.lock().await;

    Ok(Json(SessionResponse {
        session: SessionView::from(&*session),
    }))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SuccessResponse> {
    let success = state.sessions.close(&id).await;
    Json(SuccessResponse { success })
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let handle = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::session_not_found(&id))?;

    // Held for the whole turn: one request in flight per session
    let mut session = handle.lock().await;

    tracing::info!(session_id = %id, chars = req.text.chars().count(), "Chat turn started");

    let result = session.submit(&state.engine, &req.text).await.map(|_| ());
    // Restart the idle clock while the turn still holds the session
    state.sessions.touch(&id).await;

    result.map_err(|e| {
        tracing::warn!(session_id = %id, error = %e, "Chat turn failed");
        match &e {
            EngineError::BackendUnavailable(_) => AppError::BadGateway(e.to_string()),
            EngineError::Prompt(_) => AppError::Internal(e.to_string()),
        }
    })?;

    tracing::info!(
        session_id = %id,
        transcript_len = session.transcript().all().len(),
        "Chat turn completed"
    );

    Ok(Json(SessionResponse {
        session: SessionView::from(&*session),
    }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("gazzi-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl AppError {
    fn session_not_found(id: &str) -> Self {
        AppError::NotFound(format!("Session not found: {id}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChatEngine;
    use crate::llm::testing::MockLlmService;
    use crate::llm::{LlmError, LlmResponse};
    use crate::session::SessionRegistry;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<MockLlmService>, Arc<SessionRegistry>) {
        let mock = Arc::new(MockLlmService::new("gemma3:1b"));
        let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
        let engine = Arc::new(ChatEngine::new(mock.clone()));
        let app = create_router(AppState::new(engine, sessions.clone()));
        (app, mock, sessions)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, post_empty("/api/sessions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["messages"], json!([]));
        body["session"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_page_info() {
        let (app, _, _) = test_app();
        let (status, body) = send(&app, get("/api/page")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Gazzi Chatbot");
        assert_eq!(body["placeholder"], "질문을 입력해 주세요.");
        assert_eq!(body["model"], "gemma3:1b");
    }

    #[tokio::test]
    async fn test_index_page_served() {
        let (app, _, _) = test_app();
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (app, mock, _) = test_app();
        mock.queue_response(LlmResponse::text("인터넷을 통해 제공되는 서비스입니다."));
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/sessions/{id}/chat"),
                &json!({ "text": "인터넷 서비스의 정의는 뭐야?" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let messages = body["session"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "인터넷 서비스의 정의는 뭐야?");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "인터넷을 통해 제공되는 서비스입니다.");

        // Re-reading the session returns the same transcript
        let (_, body) = send(&app, get(&format!("/api/sessions/{id}"))).await;
        assert_eq!(body["session"]["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_backend_failure_is_bad_gateway_and_keeps_user_entry() {
        let (app, mock, _) = test_app();
        mock.queue_error(LlmError::network("Connection failed"));
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            post_json(&format!("/api/sessions/{id}/chat"), &json!({ "text": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("Connection failed"));

        let (_, body) = send(&app, get(&format!("/api/sessions/{id}"))).await;
        let messages = body["session"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_calling_backend() {
        let (app, mock, _) = test_app();
        let id = new_session(&app).await;

        for text in ["", "   \n"] {
            let (status, _) = send(
                &app,
                post_json(&format!("/api/sessions/{id}/chat"), &json!({ "text": text })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        assert!(mock.recorded_requests().is_empty());
        let (_, body) = send(&app, get(&format!("/api/sessions/{id}"))).await;
        assert_eq!(body["session"]["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (app, _, _) = test_app();
        let (status, body) = send(&app, get("/api/sessions/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nope"));

        let (status, _) = send(
            &app,
            post_json("/api/sessions/nope/chat", &json!({ "text": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_close_discards_session() {
        let (app, _, sessions) = test_app();
        let id = new_session(&app).await;
        assert_eq!(sessions.len().await, 1);

        let (status, body) = send(&app, post_empty(&format!("/api/sessions/{id}/close"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(sessions.len().await, 0);

        let (status, _) = send(&app, get(&format!("/api/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, post_empty(&format!("/api/sessions/{id}/close"))).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_bad_request() {
        let (app, mock, _) = test_app();
        let id = new_session(&app).await;
        let uri = format!("/api/sessions/{id}/chat");

        let (status, body) = send(&app, post_json(&uri, &json!({ "question": "hi" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("text"));

        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        assert!(mock.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced_by_new_one() {
        let (app, mock, sessions) = test_app();
        mock.queue_response(LlmResponse::text("answer"));
        let stale = new_session(&app).await;

        let later = std::time::Instant::now() + Duration::from_secs(120);
        assert_eq!(sessions.sweep_expired(later).await, 1);

        let (status, body) = send(
            &app,
            post_json(&format!("/api/sessions/{stale}/chat"), &json!({ "text": "q" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        // The page recovers by opening a fresh session and resending
        let fresh = new_session(&app).await;
        let (status, body) = send(
            &app,
            post_json(&format!("/api/sessions/{fresh}/chat"), &json!({ "text": "q" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_page_script_keeps_cached_sessions_and_retries() {
        let (app, _, _) = test_app();
        let response = app.oneshot(get("/assets/app.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let script = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(script.contains("event.persisted"));
        assert!(script.contains("err.status !== 404"));
    }

    #[tokio::test]
    async fn test_sessions_have_separate_transcripts() {
        let (app, mock, _) = test_app();
        mock.queue_response(LlmResponse::text("a"));
        let first = new_session(&app).await;
        let second = new_session(&app).await;

        send(
            &app,
            post_json(&format!("/api/sessions/{first}/chat"), &json!({ "text": "q" })),
        )
        .await;

        let (_, body) = send(&app, get(&format!("/api/sessions/{second}"))).await;
        assert_eq!(body["session"]["messages"], json!([]));
    }
}
