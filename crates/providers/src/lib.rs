//! LLM provider implementations for Attache.
//!
//! The orchestrator depends only on the [`attache_core::LlmProvider`]
//! trait; this crate supplies the concrete backends. The OpenAI-compatible
//! provider covers the vast majority of deployments (OpenAI, OpenRouter,
//! vLLM, Ollama, LM Studio, and any other `/chat/completions` endpoint).

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use attache_config::AppConfig;
use attache_core::LlmProvider;
use std::sync::Arc;

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn LlmProvider> {
    Arc::new(
        OpenAiCompatProvider::new(
            &config.llm.base_url,
            config.llm.api_key.as_deref().unwrap_or_default(),
        )
        .with_timeout_ms(config.llm.timeout_ms),
    )
}
