//! Inbound chat request types.
//!
//! A `ChatRequest` is what the gateway deserializes from `POST /chat`:
//! an ordered list of turns, an optional conversation id, and an optional
//! session handle carrying credentials for downstream productivity APIs.

use serde::{Deserialize, Serialize};

/// The role of a turn in the inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

/// A single message in the inbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Who sent this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// If the user interacted with a widget, the action taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_action: Option<WidgetAction>,
}

impl Turn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            widget_action: None,
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            widget_action: None,
        }
    }
}

/// A widget interaction carried alongside a user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetAction {
    /// Id of the widget the user interacted with
    pub widget_id: String,

    /// The action name (e.g. "reply", "join", "submit")
    pub action: String,

    /// Action-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// Opaque per-request session credentials for downstream APIs.
///
/// Owned by the request. The orchestrator lends it to tool handlers for the
/// duration of one `process` call via [`crate::tool::SessionContext`];
/// handlers must not retain it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    /// The session token sent to downstream APIs
    pub session: String,

    /// Per-session base URL for the email API cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Cluster identifier, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
}

/// An inbound chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Ordered conversation turns; the last must be a user turn
    pub messages: Vec<Turn>,

    /// Existing conversation id (omit to create new)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Session credentials for API-backed tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_info: Option<SessionHandle>,
}

impl ChatRequest {
    /// The final user turn, if the request is well-formed.
    pub fn last_user_turn(&self) -> Option<&Turn> {
        self.messages
            .last()
            .filter(|turn| turn.role == Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_user_turn_present() {
        let req = ChatRequest {
            messages: vec![Turn::assistant("Hi!"), Turn::user("any new emails?")],
            conversation_id: None,
            session_info: None,
        };
        assert_eq!(req.last_user_turn().unwrap().content, "any new emails?");
    }

    #[test]
    fn last_turn_not_user_rejected() {
        let req = ChatRequest {
            messages: vec![Turn::user("hello"), Turn::assistant("Hi!")],
            conversation_id: None,
            session_info: None,
        };
        assert!(req.last_user_turn().is_none());
    }

    #[test]
    fn empty_request_rejected() {
        let req = ChatRequest {
            messages: vec![],
            conversation_id: None,
            session_info: None,
        };
        assert!(req.last_user_turn().is_none());
    }

    #[test]
    fn request_deserializes_from_camel_case_wire() {
        let json = r#"{
            "messages": [{"role": "user", "content": "show my calendar"}],
            "conversationId": "conv-1",
            "sessionInfo": {"session": "tok-abc", "baseUrl": "https://mail.example.com/api/"}
        }"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.conversation_id.as_deref(), Some("conv-1"));
        let session = req.session_info.unwrap();
        assert_eq!(session.session, "tok-abc");
        assert_eq!(
            session.base_url.as_deref(),
            Some("https://mail.example.com/api/")
        );
        assert!(session.cluster_id.is_none());
    }

    #[test]
    fn widget_action_round_trips() {
        let turn = Turn {
            role: Role::User,
            content: "submit it".into(),
            widget_action: Some(WidgetAction {
                widget_id: "widget-3".into(),
                action: "submit".into(),
                payload: Some(serde_json::json!({"field": "value"})),
            }),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("widgetAction"));
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.widget_action.unwrap().widget_id, "widget-3");
    }
}
