//! Current date-time tool. No domain tag, so it is offered for every
//! detected domain.

use async_trait::async_trait;
use attache_core::tool::{
    ActionKind, ParameterSchema, SessionContext, Tool, ToolDescriptor, ToolOutput, ToolResult,
    UsageHints,
};
use chrono::Utc;
use serde_json::{json, Map, Value};

pub struct CurrentDatetimeTool;

#[async_trait]
impl Tool for CurrentDatetimeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "get_current_datetime".into(),
            description: "Get the current date and time in UTC.".into(),
            parameters: ParameterSchema::default(),
            domain: None,
            hints: UsageHints {
                when_to_use: Some(
                    "You need the current date to interpret a relative request like \
                     \"today\" or \"next week\"."
                        .into(),
                ),
                when_not_to_use: None,
                prerequisites: None,
                output: Some(ToolOutput::Text),
            },
            kind: ActionKind::Internal,
        }
    }

    async fn execute(&self, _arguments: &Map<String, Value>, _ctx: &SessionContext) -> ToolResult {
        let now = Utc::now();
        ToolResult::ok(json!({
            "iso": now.to_rfc3339(),
            "date": now.format("%Y-%m-%d").to_string(),
            "time": now.format("%H:%M:%S").to_string(),
            "weekday": now.format("%A").to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_current_date_fields() {
        let tool = CurrentDatetimeTool;
        let result = tool
            .execute(&Map::new(), &SessionContext::default())
            .await;
        assert!(result.success);
        let data = result.data.unwrap();
        assert!(data["iso"].as_str().unwrap().contains('T'));
        assert_eq!(data["date"].as_str().unwrap().len(), 10);
        assert!(!data["weekday"].as_str().unwrap().is_empty());
    }

    #[test]
    fn tool_is_undomained() {
        assert!(CurrentDatetimeTool.descriptor().domain.is_none());
    }
}
