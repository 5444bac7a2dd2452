//! Email tool handlers: fetch, search, and send.
//!
//! Each handler maps the upstream wire records into decoded data for the
//! LLM plus `email_preview` / `search_results` widgets for the client.
//! The response mapping is pure and unit-tested separately from the HTTP
//! plumbing.

use async_trait::async_trait;
use attache_core::activity::{ActivitySnapshot, ActivitySource};
use attache_core::tool::{
    ActionKind, Domain, ParamSpec, ParameterSchema, SessionContext, Tool, ToolDescriptor,
    ToolOutput, ToolResult, UsageHints,
};
use attache_core::widget::{WidgetBlock, WidgetType};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::flags::MessageState;
use crate::http::ApiClient;

/// At most this many preview widgets per fetch, regardless of result size.
const MAX_PREVIEW_WIDGETS: usize = 5;

/// Decode one upstream message record.
fn decode_message(record: &Value) -> Value {
    let state = MessageState::from_bits(record["state"].as_u64().unwrap_or(0));
    json!({
        "id": record["id"],
        "from": record["from"],
        "to": record["to"],
        "subject": record["subject"],
        "snippet": record["snippet"],
        "date": record["date"],
        "unread": state.unread,
        "starred": state.starred,
        "draft": state.draft,
        "has_attachment": state.has_attachment,
        "tracked": state.tracked,
    })
}

/// Build the preview widgets for a decoded message list.
fn preview_widgets(messages: &[Value]) -> Vec<WidgetBlock> {
    messages
        .iter()
        .take(MAX_PREVIEW_WIDGETS)
        .map(|m| {
            WidgetBlock::new(
                WidgetType::EmailPreview,
                json!({
                    "from": m["from"],
                    "subject": m["subject"],
                    "snippet": m["snippet"],
                    "date": m["date"],
                    "unread": m["unread"],
                    "has_attachment": m["has_attachment"],
                }),
                &["reply", "archive", "open"],
            )
        })
        .collect()
}

/// Map an upstream message-list response into a `ToolResult`.
fn map_message_list(response: &Value) -> ToolResult {
    let messages: Vec<Value> = response["messages"]
        .as_array()
        .map(|list| list.iter().map(decode_message).collect())
        .unwrap_or_default();
    let widgets = preview_widgets(&messages);
    ToolResult::ok_with_widgets(
        json!({ "count": messages.len(), "messages": messages }),
        widgets,
    )
}

// ── fetch_messages ────────────────────────────────────────────────────────

pub struct FetchMessagesTool {
    client: Arc<ApiClient>,
}

impl FetchMessagesTool {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FetchMessagesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "fetch_messages".into(),
            description: "Fetch the user's recent email messages, optionally limited to \
                          unread mail or a specific date."
                .into(),
            parameters: ParameterSchema::new(
                vec![
                    ParamSpec::new("unreadOnly", "boolean", "Return only unread messages")
                        .with_default(json!(false)),
                    ParamSpec::new(
                        "filterDate",
                        "string",
                        "Only messages from this date, formatted YYYY-MM-DD",
                    ),
                    ParamSpec::new("limit", "integer", "Maximum number of messages")
                        .with_default(json!(10)),
                ],
                &[],
            ),
            domain: Some(Domain::Email),
            hints: UsageHints {
                when_to_use: Some(
                    "The user asks about recent, new, or unread mail, or mail from a \
                     specific day."
                        .into(),
                ),
                when_not_to_use: Some(
                    "The user is looking for something specific by sender or topic; use \
                     search_messages instead."
                        .into(),
                ),
                prerequisites: None,
                output: Some(ToolOutput::Both),
            },
            kind: ActionKind::Api,
        }
    }

    async fn execute(&self, arguments: &Map<String, Value>, ctx: &SessionContext) -> ToolResult {
        let mut query: Vec<(&str, String)> = Vec::new();
        if arguments
            .get("unreadOnly")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            query.push(("unread_only", "true".into()));
        }
        if let Some(date) = arguments.get("filterDate").and_then(|v| v.as_str()) {
            query.push(("date", date.to_string()));
        }
        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(10);
        query.push(("limit", limit.to_string()));

        match self.client.get_email(ctx, "/messages", &query).await {
            Ok(response) => map_message_list(&response),
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }
}

// ── search_messages ───────────────────────────────────────────────────────

pub struct SearchMessagesTool {
    client: Arc<ApiClient>,
}

impl SearchMessagesTool {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

/// Map an upstream search response into a `ToolResult` with one
/// `search_results` widget.
fn map_search_results(query_text: &str, response: &Value) -> ToolResult {
    let messages: Vec<Value> = response["messages"]
        .as_array()
        .map(|list| list.iter().map(decode_message).collect())
        .unwrap_or_default();

    let results: Vec<Value> = messages
        .iter()
        .map(|m| {
            json!({
                "title": m["subject"],
                "description": m["snippet"],
                "from": m["from"],
                "date": m["date"],
            })
        })
        .collect();

    let widget = WidgetBlock::new(
        WidgetType::SearchResults,
        json!({ "query": query_text, "results": results }),
        &["open"],
    );

    ToolResult::ok_with_widgets(
        json!({ "count": messages.len(), "messages": messages }),
        vec![widget],
    )
}

#[async_trait]
impl Tool for SearchMessagesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "search_messages".into(),
            description: "Search the user's email by sender, subject, or content.".into(),
            parameters: ParameterSchema::new(
                vec![
                    ParamSpec::new("query", "string", "Search terms; keep them short"),
                    ParamSpec::new("limit", "integer", "Maximum number of results")
                        .with_default(json!(10)),
                ],
                &["query"],
            ),
            domain: Some(Domain::Email),
            hints: UsageHints {
                when_to_use: Some(
                    "The user wants mail matching a sender, topic, or keyword.".into(),
                ),
                when_not_to_use: Some(
                    "The user just wants recent or unread mail; use fetch_messages.".into(),
                ),
                prerequisites: None,
                output: Some(ToolOutput::Both),
            },
            kind: ActionKind::Api,
        }
    }

    async fn execute(&self, arguments: &Map<String, Value>, ctx: &SessionContext) -> ToolResult {
        let Some(query_text) = arguments.get("query").and_then(|v| v.as_str()) else {
            return ToolResult::fail("Missing required parameter \"query\"");
        };
        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(10);

        let query = vec![
            ("q", query_text.to_string()),
            ("limit", limit.to_string()),
        ];
        match self.client.get_email(ctx, "/messages/search", &query).await {
            Ok(response) => map_search_results(query_text, &response),
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }
}

// ── send_message ──────────────────────────────────────────────────────────

pub struct SendMessageTool {
    client: Arc<ApiClient>,
}

impl SendMessageTool {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SendMessageTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "send_message".into(),
            description: "Send an email on the user's behalf.".into(),
            parameters: ParameterSchema::new(
                vec![
                    ParamSpec::new("to", "array", "Recipient email addresses")
                        .with_items("string"),
                    ParamSpec::new("subject", "string", "Subject line"),
                    ParamSpec::new("body", "string", "Message body"),
                ],
                &["to", "subject", "body"],
            ),
            domain: Some(Domain::Email),
            hints: UsageHints {
                when_to_use: Some("The user explicitly asked to send an email.".into()),
                when_not_to_use: Some(
                    "The user is drafting or thinking out loud; confirm before sending.".into(),
                ),
                prerequisites: Some(
                    "Real recipient addresses. Never derive an address from a bare name."
                        .into(),
                ),
                output: Some(ToolOutput::Text),
            },
            kind: ActionKind::Api,
        }
    }

    async fn execute(&self, arguments: &Map<String, Value>, ctx: &SessionContext) -> ToolResult {
        let recipients: Vec<String> = arguments
            .get("to")
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        if recipients.is_empty() {
            return ToolResult::fail("At least one recipient address is required");
        }
        if let Some(bad) = recipients.iter().find(|r| !r.contains('@')) {
            return ToolResult::fail(format!("\"{bad}\" is not a valid email address"));
        }

        let body = json!({
            "to": recipients,
            "subject": arguments.get("subject").cloned().unwrap_or_default(),
            "body": arguments.get("body").cloned().unwrap_or_default(),
        });

        debug!(recipients = recipients.len(), "Sending message");
        match self.client.post_email(ctx, "/messages/send", body).await {
            Ok(response) => ToolResult::ok(json!({ "sent": true, "id": response["id"] })),
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }
}

// ── Activity source ───────────────────────────────────────────────────────

/// Unread-count probe for the user-context block. Failures are silent.
pub struct EmailActivitySource {
    client: Arc<ApiClient>,
}

impl EmailActivitySource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActivitySource for EmailActivitySource {
    async fn snapshot(&self, ctx: &SessionContext) -> Option<ActivitySnapshot> {
        let response = self
            .client
            .get_email(ctx, "/messages/unread-count", &[])
            .await
            .ok()?;
        Some(ActivitySnapshot {
            unread_messages: response["count"].as_u64().map(|n| n as usize),
        })
    }
}
