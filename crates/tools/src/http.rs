//! Outbound HTTP plumbing shared by the API-backed tools.
//!
//! Base-URL rules: email calls prefer the per-session base URL from the
//! request and fall back to the configured one; calendar calls always use
//! the fixed environment base URL. Session headers carry the bearer token;
//! calendar requests additionally advertise iCal support.

use attache_core::error::ToolError;
use attache_core::tool::SessionContext;
use serde_json::Value;
use tracing::{debug, warn};

/// Which downstream service a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Email,
    Calendar,
}

/// Shared client for the email and calendar APIs.
pub struct ApiClient {
    client: reqwest::Client,
    email_base_fallback: String,
    calendar_base: String,
}

impl ApiClient {
    pub fn new(email_base_fallback: impl Into<String>, calendar_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            email_base_fallback: email_base_fallback.into(),
            calendar_base: calendar_base.into(),
        }
    }

    /// Normalize and join a base URL and an endpoint path: trailing slashes
    /// are stripped from the base, a leading slash is ensured on the path.
    pub fn join_url(base: &str, path: &str) -> String {
        let base = base.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub async fn get_email(
        &self,
        ctx: &SessionContext,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        self.request(Service::Email, reqwest::Method::GET, ctx, path, query, None)
            .await
    }

    pub async fn post_email(
        &self,
        ctx: &SessionContext,
        path: &str,
        body: Value,
    ) -> Result<Value, ToolError> {
        self.request(Service::Email, reqwest::Method::POST, ctx, path, &[], Some(body))
            .await
    }

    pub async fn get_calendar(
        &self,
        ctx: &SessionContext,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        self.request(Service::Calendar, reqwest::Method::GET, ctx, path, query, None)
            .await
    }

    pub async fn post_calendar(
        &self,
        ctx: &SessionContext,
        path: &str,
        body: Value,
    ) -> Result<Value, ToolError> {
        self.request(
            Service::Calendar,
            reqwest::Method::POST,
            ctx,
            path,
            &[],
            Some(body),
        )
        .await
    }

    async fn request(
        &self,
        service: Service,
        method: reqwest::Method,
        ctx: &SessionContext,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, ToolError> {
        let token = ctx.token().ok_or_else(|| {
            ToolError::SessionRequired("this request requires the user's session".into())
        })?;

        let base = match service {
            Service::Email => ctx.base_url().unwrap_or(&self.email_base_fallback),
            Service::Calendar => &self.calendar_base,
        };
        let url = Self::join_url(base, path);
        debug!(%url, ?service, "Outbound API request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bearer {token}"));
        if service == Service::Calendar {
            request = request.header("X-Supports-Ical", "true");
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: path.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            warn!(status, %url, "Upstream API error");
            return Err(ToolError::Upstream { status, message });
        }

        response.json().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: path.to_string(),
            reason: format!("invalid JSON from upstream: {e}"),
        })
    }
}
