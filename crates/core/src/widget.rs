//! Widget model — typed UI descriptors the client renders.
//!
//! Two families: predefined widgets (a known `type` with a type-specific
//! `data` schema) and custom widgets (`type = "custom"` carrying a vdom
//! tree of whitelisted components).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide monotonic widget id counter.
static WIDGET_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Mint a unique widget id.
pub fn next_widget_id() -> String {
    format!("widget-{}", WIDGET_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Component names allowed in custom vdom trees.
pub const ALLOWED_COMPONENTS: &[&str] = &[
    "container", "row", "column", "card", "text", "heading", "button", "input", "select",
    "checkbox", "label", "image", "link", "list", "list_item", "divider", "badge", "progress",
];

/// Whether a component name is allowed in a vdom tree.
pub fn is_allowed_component(name: &str) -> bool {
    ALLOWED_COMPONENTS.contains(&name)
}

/// The known widget types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    EmailPreview,
    CalendarEvent,
    SearchResults,
    Form,
    MeetingCard,
    FlightCard,
    Custom,
}

impl WidgetType {
    /// Parse a raw type string as emitted by the LLM or a tool.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email_preview" => Some(Self::EmailPreview),
            "calendar_event" => Some(Self::CalendarEvent),
            "search_results" => Some(Self::SearchResults),
            "form" => Some(Self::Form),
            "meeting_card" => Some(Self::MeetingCard),
            "flight_card" => Some(Self::FlightCard),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A node in a custom widget's vdom tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdomNode {
    /// Whitelisted component name
    pub component: String,

    /// Component props; `props.action` marks an interactive binding
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VdomChild>,
}

/// A vdom child: either a nested node or a text leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VdomChild {
    Node(VdomNode),
    Text(String),
}

impl VdomNode {
    /// Validate that every component in the tree is whitelisted.
    pub fn validate(&self) -> Result<(), String> {
        if !is_allowed_component(&self.component) {
            return Err(format!("unknown component: {}", self.component));
        }
        for child in &self.children {
            if let VdomChild::Node(node) = child {
                node.validate()?;
            }
        }
        Ok(())
    }
}

/// A fully-formed widget ready for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetBlock {
    /// Process-unique widget id
    pub id: String,

    #[serde(rename = "type")]
    pub widget_type: WidgetType,

    /// Type-specific payload
    pub data: Value,

    /// Action names the client may offer on this widget
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,

    /// Present only for `custom` widgets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdom: Option<VdomNode>,
}

impl WidgetBlock {
    /// Create a predefined widget with a fresh id.
    pub fn new(widget_type: WidgetType, data: Value, actions: &[&str]) -> Self {
        Self {
            id: next_widget_id(),
            widget_type,
            data,
            actions: actions.iter().map(|s| s.to_string()).collect(),
            vdom: None,
        }
    }

    /// Create a custom widget from a vdom tree.
    pub fn custom(vdom: VdomNode) -> Self {
        Self {
            id: next_widget_id(),
            widget_type: WidgetType::Custom,
            data: Value::Null,
            actions: Vec::new(),
            vdom: Some(vdom),
        }
    }
}

/// A widget as described by the LLM, before validation.
///
/// The response parser collects these raw; the widget generator validates
/// and converts them into [`WidgetBlock`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetDescriptor {
    #[serde(rename = "type")]
    pub widget_type: String,

    #[serde(default)]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdom: Option<VdomNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_ids_are_unique_and_monotonic() {
        let a = next_widget_id();
        let b = next_widget_id();
        assert_ne!(a, b);
        let na: u64 = a.strip_prefix("widget-").unwrap().parse().unwrap();
        let nb: u64 = b.strip_prefix("widget-").unwrap().parse().unwrap();
        assert!(nb > na);
    }

    #[test]
    fn widget_type_parses_known_names() {
        assert_eq!(WidgetType::parse("email_preview"), Some(WidgetType::EmailPreview));
        assert_eq!(WidgetType::parse("custom"), Some(WidgetType::Custom));
        assert_eq!(WidgetType::parse("hologram"), None);
    }

    #[test]
    fn widget_serializes_with_type_tag() {
        let w = WidgetBlock::new(
            WidgetType::EmailPreview,
            serde_json::json!({"from": "ana@example.com", "subject": "Q3 invoice"}),
            &["reply", "archive", "open"],
        );
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["type"], "email_preview");
        assert_eq!(json["actions"][0], "reply");
        assert!(json.get("vdom").is_none());
    }

    #[test]
    fn vdom_validates_whitelisted_components() {
        let node = VdomNode {
            component: "card".into(),
            props: Map::new(),
            children: vec![
                VdomChild::Node(VdomNode {
                    component: "text".into(),
                    props: Map::new(),
                    children: vec![VdomChild::Text("hello".into())],
                }),
            ],
        };
        assert!(node.validate().is_ok());
    }

    #[test]
    fn vdom_rejects_unknown_components() {
        let node = VdomNode {
            component: "container".into(),
            props: Map::new(),
            children: vec![VdomChild::Node(VdomNode {
                component: "iframe".into(),
                props: Map::new(),
                children: vec![],
            })],
        };
        let err = node.validate().unwrap_err();
        assert!(err.contains("iframe"));
    }

    #[test]
    fn vdom_children_deserialize_mixed() {
        let json = r#"{
            "component": "row",
            "children": [
                "plain text",
                {"component": "button", "props": {"action": "submit", "label": "Send"}}
            ]
        }"#;
        let node: VdomNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.children.len(), 2);
        assert!(matches!(node.children[0], VdomChild::Text(_)));
        match &node.children[1] {
            VdomChild::Node(n) => assert_eq!(n.props["action"], "submit"),
            VdomChild::Text(_) => panic!("expected node child"),
        }
    }

    #[test]
    fn custom_widget_carries_vdom() {
        let w = WidgetBlock::custom(VdomNode {
            component: "container".into(),
            props: Map::new(),
            children: vec![],
        });
        assert_eq!(w.widget_type, WidgetType::Custom);
        assert!(w.vdom.is_some());
    }
}
