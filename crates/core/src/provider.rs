//! LLM provider trait — the abstraction over chat model backends.
//!
//! The orchestrator needs exactly two things from a provider: a streaming
//! chat primitive and an availability probe. Tool use is *not* negotiated
//! natively with the provider; the model is instructed (via the response
//! format prompt section) to emit a structured JSON reply, and the response
//! parser extracts tool calls from the accumulated text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// The role of a message sent to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in an LLM request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A streaming chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    pub model: String,

    pub messages: Vec<ChatMessage>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            content: None,
            done: true,
        }
    }
}

/// The core LLM provider trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// A human-readable name for this provider (e.g. "openai-compat").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response chunks.
    ///
    /// Stream-level failures arrive as `Err` items on the channel; the
    /// channel closing after a `done` chunk (or an error) ends the stream.
    async fn stream_chat(
        &self,
        request: ChatStreamRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    >;

    /// Availability probe — can we reach the provider right now?
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        assert_eq!(ChatMessage::system("s").role, MessageRole::System);
        assert_eq!(ChatMessage::user("u").role, MessageRole::User);
        assert_eq!(ChatMessage::assistant("a").role, MessageRole::Assistant);
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
    }

    #[test]
    fn chunk_constructors() {
        let c = StreamChunk::content("hello");
        assert_eq!(c.content.as_deref(), Some("hello"));
        assert!(!c.done);
        assert!(StreamChunk::done().done);
    }
}
