//! API request and response types

use crate::session::{Message, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Session with its full transcript
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            created_at: session.created_at(),
            messages: session.transcript().all().to_vec(),
        }
    }
}

/// Response with a single session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionView,
}

/// Static page metadata for the chat UI
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub title: String,
    pub icon: String,
    pub placeholder: String,
    pub model: String,
}

impl PageInfo {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            title: "Gazzi Chatbot".to_string(),
            icon: "📚".to_string(),
            placeholder: "질문을 입력해 주세요.".to_string(),
            model: model.into(),
        }
    }
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
