//! Tool handlers for the Attache agent backend.
//!
//! Thin wrappers over the external email and calendar APIs. Each handler
//! accepts typed arguments from the LLM and returns a `ToolResult` with
//! raw `data` (for the LLM to reason over on the next iteration) and
//! optional `widgets` (for the client to render).

pub mod calendar;
pub mod email;
pub mod flags;
pub mod http;
pub mod time;

pub use http::ApiClient;

use attache_config::AppConfig;
use attache_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the shared outbound API client from configuration.
pub fn build_api_client(config: &AppConfig) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(
        &config.apis.email_base_url,
        config.apis.calendar_base_url(),
    ))
}

/// Create the default tool registry with all built-in tools.
pub fn default_registry(client: Arc<ApiClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(email::FetchMessagesTool::new(client.clone())));
    registry.register(Arc::new(email::SearchMessagesTool::new(client.clone())));
    registry.register(Arc::new(email::SendMessageTool::new(client.clone())));
    registry.register(Arc::new(calendar::FetchEventsTool::new(client.clone())));
    registry.register(Arc::new(calendar::CreateEventTool::new(client)));
    registry.register(Arc::new(time::CurrentDatetimeTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_expected_tools() {
        let client = Arc::new(ApiClient::new(
            "https://mail.example.com/api",
            "https://calendar.example.com/api",
        ));
        let registry = default_registry(client);
        let names = registry.names();
        assert_eq!(
            names,
            vec![
                "create_event",
                "fetch_events",
                "fetch_messages",
                "get_current_datetime",
                "search_messages",
                "send_message",
            ]
        );
    }
}
