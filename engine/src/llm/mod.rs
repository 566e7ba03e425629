//! Chat Model Provider Abstraction Layer
//!
//! This module provides a narrow interface to external text-generation
//! backends. The `ChatModel` trait defines the contract a provider must
//! implement; the orchestration core and the capability agents depend on
//! nothing else about the backend.
//!
//! Also included are lenient JSON extraction helpers for model output, which
//! routinely arrives wrapped in code fences or surrounded by prose.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod openrouter;

pub use openrouter::OpenRouterClient;

/// Result type for chat model operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur during chat model operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Sampling options for a completion call
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 512,
        }
    }
}

/// Chat model trait that all providers must implement
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the name of the provider (e.g. "openrouter")
    fn name(&self) -> &str;

    /// Generate a text completion for the given conversation
    ///
    /// # Arguments
    /// * `model` - Provider model identifier to use for this call
    /// * `messages` - Conversation including system prompt and user messages
    /// * `options` - Sampling options
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<String>;
}

/// Extract the first balanced JSON object from model output.
///
/// Handles raw JSON, fenced JSON, and JSON embedded in prose by scanning for
/// the first `{` and counting brace depth while respecting string literals.
pub fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    extract_balanced(&content[start..], '{', '}')
}

/// Extract the first balanced JSON array from model output.
pub fn extract_json_array(content: &str) -> Option<&str> {
    let start = content.find('[')?;
    extract_balanced(&content[start..], '[', ']')
}

/// Extract a balanced `open`..`close` span starting at position 0 of `s`.
///
/// Counts delimiter depth, respecting string literals, to find the matching
/// close delimiter.
fn extract_balanced(s: &str, open: char, close: char) -> Option<&str> {
    if !s.starts_with(open) {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
