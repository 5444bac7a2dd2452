//! Outbound stream events.
//!
//! Everything the orchestrator sends to the client goes through this tagged
//! union: text deltas, widgets, status updates, and exactly one terminal
//! event (`done` or `error`) per turn.

use serde::{Deserialize, Serialize};

use crate::widget::WidgetBlock;

/// Error codes surfaced on the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request or missing last-user-turn
    ValidationError,
    /// Availability probe failed
    LlmUnavailable,
    /// Stream-level error from the LLM provider
    LlmError,
    /// Unclassified orchestrator failure
    AgentError,
}

/// Events emitted on the outbound stream.
///
/// Ordering within a turn is strictly as emitted by the orchestrator; the
/// sink guarantees in-order delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Partial text token of the final response.
    TextDelta { content: String },

    /// A widget for the client to render.
    Widget { widget: WidgetBlock },

    /// Progress indicator ("Thinking...", "Processing tool results...").
    Status { status: String },

    /// The turn completed normally.
    Done,

    /// The turn terminated with an error.
    Error { message: String, code: ErrorCode },
}

impl StreamEvent {
    /// Whether this event terminates the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{WidgetBlock, WidgetType};

    #[test]
    fn text_delta_serialization() {
        let event = StreamEvent::TextDelta {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"text_delta""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn done_serialization() {
        let json = serde_json::to_string(&StreamEvent::Done).unwrap();
        assert_eq!(json, r#"{"type":"done"}"#);
    }

    #[test]
    fn error_serialization_uses_screaming_codes() {
        let event = StreamEvent::Error {
            message: "probe failed".into(),
            code: ErrorCode::LlmUnavailable,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""code":"LLM_UNAVAILABLE""#));
    }

    #[test]
    fn widget_event_serialization() {
        let event = StreamEvent::Widget {
            widget: WidgetBlock::new(
                WidgetType::SearchResults,
                serde_json::json!({"results": []}),
                &["open"],
            ),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"widget""#));
        assert!(json.contains(r#""search_results""#));
    }

    #[test]
    fn terminal_classification() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::Error {
            message: "x".into(),
            code: ErrorCode::AgentError
        }
        .is_terminal());
        assert!(!StreamEvent::Status {
            status: "Thinking...".into()
        }
        .is_terminal());
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"status","status":"Thinking..."}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Status { status } => assert_eq!(status, "Thinking..."),
            _ => panic!("Wrong variant"),
        }
    }
}
