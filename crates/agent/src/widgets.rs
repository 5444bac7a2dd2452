//! Widget generator — collection from tool results and validation of
//! LLM-described widgets.
//!
//! Tool handlers construct their own `WidgetBlock`s; the generator's job
//! there is ordering. LLM-emitted descriptors are untrusted and get
//! validated: known type, minimally plausible data, whitelisted vdom.

use serde_json::Value;
use tracing::warn;

use attache_core::tool::ToolResult;
use attache_core::widget::{WidgetBlock, WidgetDescriptor, WidgetType};

/// Collects and validates widgets for the orchestrator.
#[derive(Debug, Default)]
pub struct WidgetGenerator;

impl WidgetGenerator {
    pub fn new() -> Self {
        Self
    }

    /// All widgets from successful results, in the given (call) order.
    pub fn from_tool_results(&self, results: &[(String, ToolResult)]) -> Vec<WidgetBlock> {
        results
            .iter()
            .filter(|(_, result)| result.success)
            .flat_map(|(_, result)| result.widgets.iter().cloned())
            .collect()
    }

    /// Validate LLM-described widgets and convert them into blocks.
    ///
    /// Invalid descriptors are dropped with a warning; they never fail the
    /// turn.
    pub fn from_llm_descriptors(&self, descriptors: &[WidgetDescriptor]) -> Vec<WidgetBlock> {
        descriptors
            .iter()
            .filter_map(|descriptor| match self.convert(descriptor) {
                Ok(widget) => Some(widget),
                Err(reason) => {
                    warn!(widget_type = %descriptor.widget_type, %reason, "Dropping invalid widget");
                    None
                }
            })
            .collect()
    }

    fn convert(&self, descriptor: &WidgetDescriptor) -> Result<WidgetBlock, String> {
        let Some(widget_type) = WidgetType::parse(&descriptor.widget_type) else {
            return Err(format!("unknown widget type: {}", descriptor.widget_type));
        };

        if widget_type == WidgetType::Custom {
            let Some(vdom) = &descriptor.vdom else {
                return Err("custom widget without vdom".into());
            };
            vdom.validate()?;
            return Ok(WidgetBlock::custom(vdom.clone()));
        }

        let Value::Object(data) = &descriptor.data else {
            return Err("widget data must be an object".into());
        };
        for key in required_keys(widget_type) {
            if !data.contains_key(*key) {
                return Err(format!("missing data field: {key}"));
            }
        }

        let actions = default_actions(widget_type, data);
        Ok(WidgetBlock::new(
            widget_type,
            descriptor.data.clone(),
            &actions,
        ))
    }
}

/// Minimum data fields per predefined type.
fn required_keys(widget_type: WidgetType) -> &'static [&'static str] {
    match widget_type {
        WidgetType::EmailPreview => &["from", "subject"],
        WidgetType::CalendarEvent => &["title"],
        WidgetType::SearchResults => &["results"],
        WidgetType::Form => &["fields"],
        WidgetType::MeetingCard => &["title"],
        WidgetType::FlightCard => &["flight_number"],
        WidgetType::Custom => &[],
    }
}

/// Default actions inferred from the widget type and its data.
fn default_actions(
    widget_type: WidgetType,
    data: &serde_json::Map<String, Value>,
) -> Vec<&'static str> {
    match widget_type {
        WidgetType::EmailPreview => vec!["reply", "archive", "open"],
        WidgetType::CalendarEvent => {
            if data.get("meeting_link").and_then(|v| v.as_str()).is_some() {
                vec!["join", "decline", "details"]
            } else {
                vec!["accept", "decline", "details"]
            }
        }
        WidgetType::SearchResults => vec!["open"],
        WidgetType::MeetingCard => vec!["join", "copy_link"],
        WidgetType::FlightCard => vec!["check_in", "details"],
        WidgetType::Form => vec!["submit"],
        WidgetType::Custom => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_core::widget::{VdomChild, VdomNode};
    use serde_json::json;

    fn descriptor(widget_type: &str, data: Value) -> WidgetDescriptor {
        WidgetDescriptor {
            widget_type: widget_type.into(),
            data,
            vdom: None,
        }
    }

    #[test]
    fn collects_widgets_from_successes_in_order() {
        let generator = WidgetGenerator::new();
        let first = WidgetBlock::new(WidgetType::EmailPreview, json!({"from": "a"}), &["open"]);
        let second = WidgetBlock::new(WidgetType::EmailPreview, json!({"from": "b"}), &["open"]);

        let results = vec![
            (
                "call-1".to_string(),
                ToolResult::ok_with_widgets(json!({}), vec![first.clone()]),
            ),
            ("call-2".to_string(), ToolResult::fail("nope")),
            (
                "call-3".to_string(),
                ToolResult::ok_with_widgets(json!({}), vec![second.clone()]),
            ),
        ];

        let widgets = generator.from_tool_results(&results);
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[0].id, first.id);
        assert_eq!(widgets[1].id, second.id);
    }

    #[test]
    fn email_preview_gets_default_actions() {
        let generator = WidgetGenerator::new();
        let widgets = generator.from_llm_descriptors(&[descriptor(
            "email_preview",
            json!({"from": "ana@example.com", "subject": "Hello"}),
        )]);
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].actions, vec!["reply", "archive", "open"]);
    }

    #[test]
    fn calendar_event_actions_depend_on_meeting_link() {
        let generator = WidgetGenerator::new();

        let with_link = generator.from_llm_descriptors(&[descriptor(
            "calendar_event",
            json!({"title": "Standup", "meeting_link": "https://meet.example.com/x"}),
        )]);
        assert_eq!(with_link[0].actions, vec!["join", "decline", "details"]);

        let without = generator.from_llm_descriptors(&[descriptor(
            "calendar_event",
            json!({"title": "Focus block"}),
        )]);
        assert_eq!(without[0].actions, vec!["accept", "decline", "details"]);
    }

    #[test]
    fn unknown_type_dropped() {
        let generator = WidgetGenerator::new();
        let widgets =
            generator.from_llm_descriptors(&[descriptor("hologram", json!({"x": 1}))]);
        assert!(widgets.is_empty());
    }

    #[test]
    fn missing_required_data_dropped() {
        let generator = WidgetGenerator::new();
        let widgets =
            generator.from_llm_descriptors(&[descriptor("email_preview", json!({"from": "a"}))]);
        assert!(widgets.is_empty());
    }

    #[test]
    fn custom_widget_requires_valid_vdom() {
        let generator = WidgetGenerator::new();

        let no_vdom = generator.from_llm_descriptors(&[descriptor("custom", Value::Null)]);
        assert!(no_vdom.is_empty());

        let good = WidgetDescriptor {
            widget_type: "custom".into(),
            data: Value::Null,
            vdom: Some(VdomNode {
                component: "card".into(),
                props: serde_json::Map::new(),
                children: vec![VdomChild::Text("hi".into())],
            }),
        };
        let widgets = generator.from_llm_descriptors(&[good]);
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].widget_type, WidgetType::Custom);
    }

    #[test]
    fn custom_widget_with_bad_component_dropped() {
        let generator = WidgetGenerator::new();
        let bad = WidgetDescriptor {
            widget_type: "custom".into(),
            data: Value::Null,
            vdom: Some(VdomNode {
                component: "script".into(),
                props: serde_json::Map::new(),
                children: vec![],
            }),
        };
        assert!(generator.from_llm_descriptors(&[bad]).is_empty());
    }
}
