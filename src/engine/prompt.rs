//! Chat prompt templates
//!
//! A template is an ordered list of `(role, text)` pairs. Text may contain
//! `{name}` placeholders; `{{` and `}}` render as literal braces.

use crate::llm::{LlmMessage, LlmRequest, MessageRole};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("missing value for template variable '{0}'")]
    MissingVariable(String),
    #[error("unclosed placeholder in template: {0}")]
    UnclosedPlaceholder(String),
    #[error("single '}}' in template at offset {0}")]
    UnmatchedClosingBrace(usize),
}

/// Ordered chat messages with `{name}` placeholders
#[derive(Debug, Clone)]
pub struct ChatPromptTemplate {
    messages: Vec<(MessageRole, String)>,
}

impl ChatPromptTemplate {
    pub fn from_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = (MessageRole, S)>,
        S: Into<String>,
    {
        Self {
            messages: messages
                .into_iter()
                .map(|(role, text)| (role, text.into()))
                .collect(),
        }
    }

    /// Substitute `vars` into every message. Values are inserted verbatim and
    /// never re-expanded.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<LlmRequest, PromptError> {
        let messages = self
            .messages
            .iter()
            .map(|(role, template)| Ok(LlmMessage::new(*role, render_text(template, vars)?)))
            .collect::<Result<Vec<_>, PromptError>>()?;
        Ok(LlmRequest::new(messages))
    }
}

fn render_text(template: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' if next_is(&mut chars, '{') => {
                chars.next();
                out.push('{');
            }
            '}' if next_is(&mut chars, '}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(PromptError::UnmatchedClosingBrace(offset)),
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) => name.push(ch),
                        None => return Err(PromptError::UnclosedPlaceholder(name)),
                    }
                }
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or(PromptError::MissingVariable(name))?;
                out.push_str(value);
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn next_is(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, expected: char) -> bool {
    chars.peek().is_some_and(|&(_, c)| c == expected)
}
