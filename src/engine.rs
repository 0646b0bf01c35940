//! Question answering chain
//!
//! `ChatEngine::ask` runs three explicit stages in order: render the fixed
//! prompt template, submit it to the model backend, and parse the reply
//! into a plain string.

mod prompt;

pub use prompt::{ChatPromptTemplate, PromptError};

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, MessageRole};
use std::sync::Arc;
use thiserror::Error;

/// Fixed system instruction: answer the question briefly and concisely, in Korean.
pub const SYSTEM_INSTRUCTION: &str = "주어진 질문에 짧고 간결하게 한글로 답변을 제공해주세요";

const QUESTION_VAR: &str = "question";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model backend unavailable: {0}")]
    BackendUnavailable(#[from] LlmError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Prompt template plus model backend
pub struct ChatEngine {
    prompt: ChatPromptTemplate,
    backend: Arc<dyn LlmService>,
}

impl ChatEngine {
    pub fn new(backend: Arc<dyn LlmService>) -> Self {
        Self {
            prompt: ChatPromptTemplate::from_messages([
                (MessageRole::System, SYSTEM_INSTRUCTION),
                (MessageRole::User, "{question}"),
            ]),
            backend,
        }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    /// Answer one question. The backend's text comes back verbatim.
    pub async fn ask(&self, user_text: &str) -> Result<String, EngineError> {
        let request = self.render(user_text)?;
        let response = submit(self.backend.as_ref(), &request).await?;
        Ok(parse(response))
    }

    fn render(&self, user_text: &str) -> Result<LlmRequest, PromptError> {
        self.prompt.render(&[(QUESTION_VAR, user_text)])
    }
}

async fn submit(backend: &dyn LlmService, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
    backend.complete(request).await
}

fn parse(response: LlmResponse) -> String {
    response.content
}
