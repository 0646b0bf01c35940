//! Chat sessions and their transcripts
//!
//! A transcript is append-only: entries are never reordered, edited or
//! removed. A session owns exactly one transcript for its lifetime.

mod registry;

pub use registry::SessionRegistry;

use crate::engine::{ChatEngine, EngineError};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered, append-only message log
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Message {
        self.messages.push(Message::new(role, content.into()));
        &self.messages[self.messages.len() - 1]
    }

    /// Entries in insertion order
    pub fn all(&self) -> &[Message] {
        &self.messages
    }
}

/// Per-tab chat state
#[derive(Debug)]
pub struct Session {
    id: String,
    transcript: Transcript,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transcript: Transcript::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run one chat turn: record the question, ask the engine, record the answer.
    ///
    /// On failure the user entry stays and no assistant entry is added.
    pub async fn submit(
        &mut self,
        engine: &ChatEngine,
        text: &str,
    ) -> Result<&Message, EngineError> {
        self.transcript.append(Role::User, text);
        let answer = engine.ask(text).await?;
        Ok(self.transcript.append(Role::Assistant, answer))
    }
}
