//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Fireworks AI,
//! and any other endpoint exposing `/chat/completions`.
//!
//! Supports:
//! - Streaming chat completions over SSE
//! - Availability probe via the models listing endpoint
//!
//! Tool calling is deliberately *not* negotiated with the provider: the
//! agent instructs the model to reply in a structured JSON format and the
//! response parser extracts tool calls from the accumulated text.

use async_trait::async_trait;
use attache_core::error::ProviderError;
use attache_core::provider::{ChatStreamRequest, LlmProvider, StreamChunk};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, trace, warn};

const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::build("openai-compat", base_url, api_key, DEFAULT_TIMEOUT_MS)
    }

    /// Override the overall per-call timeout.
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        Self::build(self.name, self.base_url, self.api_key, timeout_ms)
    }

    fn build(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_ms,
            client,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_chat(
        &self,
        request: ChatStreamRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": true,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(format!("no response within {}ms", self.timeout_ms))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let data = data.trim();

                    if data == "[DONE]" {
                        let _ = tx.send(Ok(StreamChunk::done())).await;
                        return;
                    }

                    let delta: StreamDelta = match serde_json::from_str(data) {
                        Ok(d) => d,
                        Err(e) => {
                            trace!(error = %e, data = %data, "Ignoring unparseable SSE line");
                            continue;
                        }
                    };

                    if let Some(message) = delta.error {
                        let _ = tx
                            .send(Err(ProviderError::ApiError {
                                status_code: 200,
                                message: message.message,
                            }))
                            .await;
                        return;
                    }

                    let content = delta
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content);
                    if let Some(text) = content {
                        if !text.is_empty() && tx.send(Ok(StreamChunk::content(text))).await.is_err()
                        {
                            return; // consumer went away
                        }
                    }
                }
            }

            // Stream ended without [DONE]; treat as complete
            let _ = tx.send(Ok(StreamChunk::done())).await;
        });

        Ok(rx)
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!(status = response.status().as_u16(), "LLM availability probe failed");
                }
                ok
            }
            Err(e) => {
                warn!(error = %e, "LLM availability probe failed");
                false
            }
        }
    }
}

// --- OpenAI-compatible stream delta types ---

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: DeltaContent,
}

#[derive(Debug, Deserialize)]
struct DeltaContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let provider = OpenAiCompatProvider::new("https://llm.example.com/v1/", "key");
        assert_eq!(provider.base_url, "https://llm.example.com/v1");
        assert_eq!(provider.name(), "openai-compat");
    }

    #[test]
    fn timeout_override() {
        let provider =
            OpenAiCompatProvider::new("https://llm.example.com/v1", "key").with_timeout_ms(1_000);
        assert_eq!(provider.timeout_ms, 1_000);
    }

    #[test]
    fn delta_parses_content() {
        let delta: StreamDelta = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            delta.choices[0].delta.content.as_deref(),
            Some("Hel")
        );
    }

    #[test]
    fn delta_parses_role_only_chunk() {
        // First chunk of a stream typically carries only the role
        let delta: StreamDelta =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(delta.choices[0].delta.content.is_none());
    }

    #[test]
    fn delta_parses_inline_error() {
        let delta: StreamDelta =
            serde_json::from_str(r#"{"error":{"message":"model overloaded"}}"#).unwrap();
        assert_eq!(delta.error.unwrap().message, "model overloaded");
    }
}
