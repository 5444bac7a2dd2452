//! Configuration loading, validation, and management for Attache.
//!
//! Loads configuration from `~/.attache/config.toml` with environment
//! variable overrides for the secrets and connection knobs. Every field has
//! a serde default so a missing or partial file still yields a working
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.attache/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cap on LLM↔tool loop depth per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Conversation prune threshold (entries per conversation)
    #[serde(default = "default_max_history_entries")]
    pub max_history_entries: usize,

    /// Most recent entries passed to the LLM when history is included
    #[serde(default = "default_context_window_entries")]
    pub context_window_entries: usize,

    /// Bypass the orchestrator and use a scripted scenario engine.
    /// The engine is not compiled into this build; enabling the flag logs
    /// a warning and serves the live agent.
    #[serde(default)]
    pub use_mock_agent: bool,

    /// LLM provider knobs
    #[serde(default)]
    pub llm: LlmConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Downstream productivity API endpoints
    #[serde(default)]
    pub apis: ApiConfig,

    /// User identity and timezone for the user-context block
    #[serde(default)]
    pub user_context: UserContextConfig,
}

fn default_max_iterations() -> u32 {
    5
}
fn default_max_history_entries() -> usize {
    50
}
fn default_context_window_entries() -> usize {
    10
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("max_iterations", &self.max_iterations)
            .field("max_history_entries", &self.max_history_entries)
            .field("context_window_entries", &self.context_window_entries)
            .field("use_mock_agent", &self.use_mock_agent)
            .field("llm", &self.llm)
            .field("gateway", &self.gateway)
            .field("apis", &self.apis)
            .field("user_context", &self.user_context)
            .finish()
    }
}

/// LLM provider knobs.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible endpoint base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// API key; env `ATTACHE_LLM_API_KEY` overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Overall per-LLM-call timeout. Generous by default; large models
    /// routinely take minutes.
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: None,
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-4o".into()
}
fn default_llm_temperature() -> f32 {
    0.7
}
fn default_llm_timeout_ms() -> u64 {
    300_000
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8088
}

/// Deployment environment for the calendar API base-URL selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Staging,
    Production,
}

/// Downstream productivity API endpoints.
///
/// The email API base URL normally arrives per-session with the request;
/// `email_base_url` is the fallback. The calendar API uses a fixed
/// environment base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_email_base_url")]
    pub email_base_url: String,

    #[serde(default = "default_calendar_staging")]
    pub calendar_base_url_staging: String,

    #[serde(default = "default_calendar_production")]
    pub calendar_base_url_production: String,

    #[serde(default = "default_environment")]
    pub environment: Environment,
}

impl ApiConfig {
    /// The calendar base URL for the configured environment.
    pub fn calendar_base_url(&self) -> &str {
        match self.environment {
            Environment::Staging => &self.calendar_base_url_staging,
            Environment::Production => &self.calendar_base_url_production,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            email_base_url: default_email_base_url(),
            calendar_base_url_staging: default_calendar_staging(),
            calendar_base_url_production: default_calendar_production(),
            environment: default_environment(),
        }
    }
}

fn default_email_base_url() -> String {
    "https://mail.example.com/api".into()
}
fn default_calendar_staging() -> String {
    "https://calendar-staging.example.com/api".into()
}
fn default_calendar_production() -> String {
    "https://calendar.example.com/api".into()
}
fn default_environment() -> Environment {
    Environment::Staging
}

/// User identity and timezone for the user-context block.
///
/// Timezone identity comes from configuration rather than a tz database:
/// the identifier and short name are used verbatim in the rendered block,
/// and `utc_offset_minutes` shifts the formatted clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContextConfig {
    /// Include the user-context block in the system prompt at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// IANA timezone identifier, e.g. "America/Los_Angeles"
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Short name shown next to the formatted time, e.g. "PT"
    #[serde(default = "default_tz_abbrev")]
    pub tz_abbrev: String,

    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for UserContextConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email: None,
            display_name: None,
            timezone: default_timezone(),
            tz_abbrev: default_tz_abbrev(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_timezone() -> String {
    "UTC".into()
}
fn default_tz_abbrev() -> String {
    "UTC".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_history_entries: default_max_history_entries(),
            context_window_entries: default_context_window_entries(),
            use_mock_agent: false,
            llm: LlmConfig::default(),
            gateway: GatewayConfig::default(),
            apis: ApiConfig::default(),
            user_context: UserContextConfig::default(),
        }
    }
}

impl AppConfig {
    /// The default config file path: `~/.attache/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        Path::new(&home).join(".attache").join("config.toml")
    }

    /// Load configuration from a TOML file, then apply env overrides.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            toml::from_str(&raw).map_err(|e| format!("invalid config: {e}"))?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("ATTACHE_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("ATTACHE_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("ATTACHE_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(port) = std::env::var("ATTACHE_PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.port = port;
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".into());
        }
        if self.max_history_entries == 0 {
            return Err("max_history_entries must be at least 1".into());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(format!(
                "llm.temperature {} out of range 0.0..=2.0",
                self.llm.temperature
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let config = AppConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.max_history_entries, 50);
        assert_eq!(config.context_window_entries, 10);
        assert_eq!(config.llm.timeout_ms, 300_000);
        assert!(!config.use_mock_agent);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            max_iterations = 3

            [llm]
            model = "local-model"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.max_history_entries, 50);
        assert_eq!(config.llm.timeout_ms, 300_000);
    }

    #[test]
    fn calendar_base_url_follows_environment() {
        let mut config = AppConfig::default();
        config.apis.environment = Environment::Production;
        assert_eq!(
            config.apis.calendar_base_url(),
            config.apis.calendar_base_url_production
        );
        config.apis.environment = Environment::Staging;
        assert_eq!(
            config.apis.calendar_base_url(),
            config.apis.calendar_base_url_staging
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-secret-123".into());
        let out = format!("{config:?}");
        assert!(!out.contains("sk-secret-123"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let config: AppConfig = toml::from_str("max_iterations = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.max_iterations, 5);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [gateway]
            port = 9999
            "#,
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.gateway.port, 9999);
    }
}
