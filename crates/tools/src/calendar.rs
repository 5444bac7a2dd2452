//! Calendar tool handlers: fetch events and create an event.
//!
//! Event and attendee attribute bitsets are decoded before anything
//! reaches the LLM or a widget; deleted events are filtered out here.

use async_trait::async_trait;
use attache_core::tool::{
    ActionKind, Domain, ParamSpec, ParameterSchema, SessionContext, Tool, ToolDescriptor,
    ToolOutput, ToolResult, UsageHints,
};
use attache_core::widget::{WidgetBlock, WidgetType};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::flags::{AttendeeAttrs, EventAttrs};
use crate::http::ApiClient;

/// Decode one upstream event record; `None` for deleted events.
fn decode_event(record: &Value) -> Option<Value> {
    let attrs = EventAttrs::from_bits(record["attributes"].as_u64().unwrap_or(0));
    if attrs.deleted {
        return None;
    }

    let attendees: Vec<Value> = record["attendees"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|a| {
                    let flags = AttendeeAttrs::from_bits(a["attributes"].as_u64().unwrap_or(0));
                    json!({
                        "email": a["email"],
                        "name": a["name"],
                        "optional": flags.optional,
                        "organizer": flags.organizer,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(json!({
        "id": record["id"],
        "title": record["title"],
        "start_time": record["start_time"],
        "end_time": record["end_time"],
        "location": record["location"],
        "meeting_link": record["meeting_link"],
        "recurring": attrs.recurring,
        "all_day": attrs.all_day,
        "external": attrs.external,
        "attendees": attendees,
    }))
}

/// Build a `calendar_event` widget for a decoded event.
fn event_widget(event: &Value) -> WidgetBlock {
    let has_link = event["meeting_link"].as_str().is_some();
    let actions: &[&str] = if has_link {
        &["join", "decline", "details"]
    } else {
        &["accept", "decline", "details"]
    };
    WidgetBlock::new(
        WidgetType::CalendarEvent,
        json!({
            "title": event["title"],
            "start_time": event["start_time"],
            "end_time": event["end_time"],
            "location": event["location"],
            "meeting_link": event["meeting_link"],
            "all_day": event["all_day"],
        }),
        actions,
    )
}

/// Map an upstream event-list response into a `ToolResult`.
fn map_event_list(response: &Value) -> ToolResult {
    let events: Vec<Value> = response["events"]
        .as_array()
        .map(|list| list.iter().filter_map(decode_event).collect())
        .unwrap_or_default();
    let widgets = events.iter().map(event_widget).collect();
    ToolResult::ok_with_widgets(json!({ "count": events.len(), "events": events }), widgets)
}

// ── fetch_events ──────────────────────────────────────────────────────────

pub struct FetchEventsTool {
    client: Arc<ApiClient>,
}

impl FetchEventsTool {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for FetchEventsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "fetch_events".into(),
            description: "Fetch the user's calendar events in a date range.".into(),
            parameters: ParameterSchema::new(
                vec![
                    ParamSpec::new("startDate", "string", "Range start, YYYY-MM-DD"),
                    ParamSpec::new(
                        "endDate",
                        "string",
                        "Range end, YYYY-MM-DD; defaults to startDate",
                    ),
                    ParamSpec::new("calendarId", "string", "Restrict to one calendar"),
                ],
                &["startDate"],
            ),
            domain: Some(Domain::Calendar),
            hints: UsageHints {
                when_to_use: Some(
                    "The user asks what is on their calendar or about a specific day's \
                     schedule."
                        .into(),
                ),
                when_not_to_use: None,
                prerequisites: None,
                output: Some(ToolOutput::Both),
            },
            kind: ActionKind::Api,
        }
    }

    async fn execute(&self, arguments: &Map<String, Value>, ctx: &SessionContext) -> ToolResult {
        let Some(start) = arguments.get("startDate").and_then(|v| v.as_str()) else {
            return ToolResult::fail("Missing required parameter \"startDate\"");
        };
        let end = arguments
            .get("endDate")
            .and_then(|v| v.as_str())
            .unwrap_or(start);

        let mut query = vec![("start", start.to_string()), ("end", end.to_string())];
        if let Some(calendar_id) = arguments.get("calendarId").and_then(|v| v.as_str()) {
            query.push(("calendar_id", calendar_id.to_string()));
        }

        match self.client.get_calendar(ctx, "/events", &query).await {
            Ok(response) => map_event_list(&response),
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }
}

// ── create_event ──────────────────────────────────────────────────────────

pub struct CreateEventTool {
    client: Arc<ApiClient>,
}

impl CreateEventTool {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "create_event".into(),
            description: "Create a calendar event on the user's primary calendar.".into(),
            parameters: ParameterSchema::new(
                vec![
                    ParamSpec::new("title", "string", "Event title"),
                    ParamSpec::new("startTime", "string", "Start, RFC 3339"),
                    ParamSpec::new("endTime", "string", "End, RFC 3339"),
                    ParamSpec::new("attendees", "array", "Attendee email addresses")
                        .with_items("string"),
                    ParamSpec::new("location", "string", "Location or meeting room"),
                ],
                &["title", "startTime", "endTime"],
            ),
            domain: Some(Domain::Calendar),
            hints: UsageHints {
                when_to_use: Some(
                    "The user explicitly asked to schedule or book something.".into(),
                ),
                when_not_to_use: Some(
                    "The user is exploring availability; fetch events instead.".into(),
                ),
                prerequisites: Some("Exact title and times from the user.".into()),
                output: Some(ToolOutput::Both),
            },
            kind: ActionKind::Api,
        }
    }

    async fn execute(&self, arguments: &Map<String, Value>, ctx: &SessionContext) -> ToolResult {
        let body = json!({
            "title": arguments.get("title").cloned().unwrap_or_default(),
            "start_time": arguments.get("startTime").cloned().unwrap_or_default(),
            "end_time": arguments.get("endTime").cloned().unwrap_or_default(),
            "attendees": arguments.get("attendees").cloned().unwrap_or(json!([])),
            "location": arguments.get("location").cloned(),
        });

        match self.client.post_calendar(ctx, "/events", body).await {
            Ok(response) => {
                let decoded = decode_event(&response).unwrap_or(response);
                let widget = event_widget(&decoded);
                ToolResult::ok_with_widgets(json!({ "created": decoded }), vec![widget])
            }
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> Value {
        json!({
            "events": [
                {
                    "id": "e1",
                    "title": "Design review",
                    "start_time": "2026-08-03T10:00:00Z",
                    "end_time": "2026-08-03T11:00:00Z",
                    "location": "Room 4",
                    "meeting_link": "https://meet.example.com/design",
                    "attributes": 0,
                    "attendees": [
                        {"email": "ana@example.com", "name": "Ana", "attributes": 0b10},
                        {"email": "leo@example.com", "name": "Leo", "attributes": 0b01}
                    ]
                },
                {
                    "id": "e2",
                    "title": "Cancelled sync",
                    "start_time": "2026-08-03T12:00:00Z",
                    "end_time": "2026-08-03T13:00:00Z",
                    "attributes": 1 << 5,
                    "attendees": []
                },
                {
                    "id": "e3",
                    "title": "Company holiday",
                    "start_time": "2026-08-04T00:00:00Z",
                    "end_time": "2026-08-05T00:00:00Z",
                    "attributes": 1 << 1,
                    "attendees": []
                }
            ]
        })
    }

    #[test]
    fn deleted_events_filtered_out() {
        let result = map_event_list(&sample_response());
        let data = result.data.unwrap();
        assert_eq!(data["count"], 2);
        let titles: Vec<&str> = data["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap())
            .collect();
        assert!(!titles.contains(&"Cancelled sync"));
    }

    #[test]
    fn attendee_attributes_decoded() {
        let result = map_event_list(&sample_response());
        let data = result.data.unwrap();
        let attendees = &data["events"][0]["attendees"];
        assert_eq!(attendees[0]["organizer"], true);
        assert_eq!(attendees[0]["optional"], false);
        assert_eq!(attendees[1]["optional"], true);
    }

    #[test]
    fn all_day_flag_decoded() {
        let result = map_event_list(&sample_response());
        let data = result.data.unwrap();
        assert_eq!(data["events"][1]["all_day"], true);
        assert_eq!(data["events"][0]["all_day"], false);
    }

    #[test]
    fn widget_actions_depend_on_meeting_link() {
        let result = map_event_list(&sample_response());
        assert_eq!(result.widgets.len(), 2);
        // First event has a link
        assert_eq!(result.widgets[0].actions, vec!["join", "decline", "details"]);
        // The all-day holiday has none
        assert_eq!(
            result.widgets[1].actions,
            vec!["accept", "decline", "details"]
        );
    }

    #[tokio::test]
    async fn fetch_requires_start_date() {
        let client = Arc::new(ApiClient::new("https://m.example.com", "https://c.example.com"));
        let tool = FetchEventsTool::new(client);
        let args = json!({});
        let result = tool
            .execute(args.as_object().unwrap(), &SessionContext::default())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("startDate"));
    }

    #[test]
    fn descriptors_are_calendar_domain() {
        let client = Arc::new(ApiClient::new("https://m.example.com", "https://c.example.com"));
        assert_eq!(
            FetchEventsTool::new(client.clone()).descriptor().domain,
            Some(Domain::Calendar)
        );
        assert_eq!(
            CreateEventTool::new(client).descriptor().domain,
            Some(Domain::Calendar)
        );
    }
}
