//! Tool executor — validation and dispatch of parsed tool calls.
//!
//! Unknown tools and bad arguments fail the *call*, never the turn: every
//! path returns a `ToolResult` that the orchestrator feeds back to the LLM.
//! Batch execution fans out concurrently and joins, preserving the call
//! order of the input list in the returned mapping regardless of which
//! handler finishes first.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use attache_core::tool::{ParameterSchema, SessionContext, ToolCall, ToolRegistry, ToolResult};

/// Validates arguments and dispatches tool calls against a registry.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Execute a single call.
    pub async fn execute(&self, call: &ToolCall, ctx: &SessionContext) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            let available = self.registry.names().join(", ");
            warn!(tool = %call.name, "Unknown tool requested");
            return ToolResult::fail(format!(
                "Unknown tool: {}; available: {available}",
                call.name
            ));
        };

        let descriptor = tool.descriptor();
        if let Some(problem) = validate_arguments(&descriptor.parameters, call) {
            warn!(tool = %call.name, %problem, "Tool argument validation failed");
            return ToolResult::fail(problem);
        }

        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool");
        tool.execute(&call.arguments, ctx).await
    }

    /// Execute all calls concurrently, joining before return.
    ///
    /// The result vector maps call id to result in the input order. Errors
    /// in one call never abort the others.
    pub async fn execute_many(
        &self,
        calls: &[ToolCall],
        ctx: &SessionContext,
    ) -> Vec<(String, ToolResult)> {
        let futures = calls.iter().map(|call| async {
            (call.id.clone(), self.execute(call, ctx).await)
        });
        join_all(futures).await
    }

    /// Execute calls one at a time, for handlers with ordering constraints.
    pub async fn execute_sequential(
        &self,
        calls: &[ToolCall],
        ctx: &SessionContext,
    ) -> Vec<(String, ToolResult)> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push((call.id.clone(), self.execute(call, ctx).await));
        }
        results
    }
}

/// Check required presence and shallow type agreement.
///
/// Returns a human-readable problem description, or `None` when the
/// arguments pass.
fn validate_arguments(schema: &ParameterSchema, call: &ToolCall) -> Option<String> {
    for required in &schema.required {
        match call.arguments.get(required) {
            None | Some(Value::Null) => {
                return Some(format!(
                    "Missing required parameter \"{required}\" for tool \"{}\"",
                    call.name
                ));
            }
            Some(_) => {}
        }
    }

    for spec in &schema.params {
        let Some(value) = call.arguments.get(&spec.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let matches = match spec.param_type.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };
        if !matches {
            return Some(format!(
                "Parameter \"{}\" of tool \"{}\" must be a {}",
                spec.name, call.name, spec.param_type
            ));
        }
    }

    None
}
