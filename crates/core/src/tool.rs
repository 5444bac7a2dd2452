//! Tool trait, descriptors, and registry.
//!
//! Tools are what give the agent the ability to act on the user's behalf:
//! fetch and search email, read and create calendar events, report the
//! current time. Each tool carries a descriptor (rendered into the system
//! prompt) and a handler.
//!
//! Session credentials are threaded through every invocation as an explicit
//! [`SessionContext`] argument rather than installed on shared handler
//! state, so concurrent requests with different sessions cannot race.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::chat::SessionHandle;
use crate::widget::WidgetBlock;

/// Coarse tag used to gate prompt fragments and tool visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Email,
    Calendar,
    General,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Email => write!(f, "email"),
            Domain::Calendar => write!(f, "calendar"),
            Domain::General => write!(f, "general"),
        }
    }
}

/// What kind of action a tool performs. Metadata only; does not affect
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Calls an external API
    Api,
    /// Resolved client-side (the widget layer acts on it)
    Client,
    /// Composes multiple other tools
    Composite,
    /// Served from process state, no I/O
    Internal,
}

/// The shape of a tool's useful output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutput {
    Text,
    Widget,
    Both,
}

/// Prompt-only guidance about when and how to use a tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_not_to_use: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ToolOutput>,
}

/// A single parameter in a tool's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    /// JSON type name: "string", "number", "integer", "boolean", "array", "object"
    pub param_type: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    /// Element type for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            enum_values: None,
            items: None,
            default: None,
        }
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_items(mut self, item_type: impl Into<String>) -> Self {
        self.items = Some(item_type.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A tool's parameter schema: ordered parameter list plus the required set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub params: Vec<ParamSpec>,
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new(params: Vec<ParamSpec>, required: &[&str]) -> Self {
        Self {
            params,
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Render as a JSON-Schema-shaped value (for health/debug endpoints).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            let mut spec = Map::new();
            spec.insert("type".into(), Value::String(p.param_type.clone()));
            spec.insert("description".into(), Value::String(p.description.clone()));
            if let Some(values) = &p.enum_values {
                spec.insert(
                    "enum".into(),
                    Value::Array(values.iter().map(|v| Value::String(v.clone())).collect()),
                );
            }
            if let Some(items) = &p.items {
                spec.insert(
                    "items".into(),
                    serde_json::json!({ "type": items }),
                );
            }
            if let Some(default) = &p.default {
                spec.insert("default".into(), default.clone());
            }
            properties.insert(p.name.clone(), Value::Object(spec));
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}

/// Everything the prompt router needs to know about a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,

    /// Tools without a domain tag are offered for every detected domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,

    #[serde(default)]
    pub hints: UsageHints,

    pub kind: ActionKind,
}

/// A request to execute a tool, as parsed from the LLM's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call id (minted by the parser when the LLM omits it)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON object
    pub arguments: Map<String, Value>,
}

/// The result of a tool execution.
///
/// `success == false` implies `error` is set and `data` absent. Tool
/// failures are values, not errors: the orchestrator feeds them back to the
/// LLM, which composes the user-facing reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,

    /// Raw data for the LLM to reason over on the next iteration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Widgets for the client to render
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub widgets: Vec<WidgetBlock>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            widgets: Vec::new(),
        }
    }

    pub fn ok_with_widgets(data: Value, widgets: Vec<WidgetBlock>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            widgets,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            widgets: Vec::new(),
        }
    }
}

/// Per-request context lent to tool handlers for the duration of one call.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session: Option<SessionHandle>,
}

impl SessionContext {
    pub fn new(session: Option<SessionHandle>) -> Self {
        Self { session }
    }

    /// The session token, if the request carried one.
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session.as_str())
    }

    /// The per-session base URL for the email API, if present.
    pub fn base_url(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.base_url.as_deref())
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}

/// The core Tool trait.
///
/// Handlers receive the parsed arguments and the per-request session
/// context. They never write to the event stream; they return values.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's descriptor (name, schema, domain, hints).
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool. Failures are reported through the returned
    /// `ToolResult`, never by panicking.
    async fn execute(&self, arguments: &Map<String, Value>, ctx: &SessionContext) -> ToolResult;
}

/// A registry of available tools, keyed by name.
///
/// Read-only after startup; safe for concurrent reads.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Last write wins; replacing logs a warning.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name;
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "Replacing previously registered tool");
        }
        self.tools.insert(name, tool);
    }

    /// Remove a tool by name. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tools whose domain is in `domains`, plus every undomained tool.
    pub fn by_domain(&self, domains: &[Domain]) -> Vec<ToolDescriptor> {
        let mut matched: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|t| t.descriptor())
            .filter(|d| match d.domain {
                Some(domain) => domains.contains(&domain),
                None => true,
            })
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        matched
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// All descriptors, sorted by name for deterministic prompt rendering.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut all: Vec<ToolDescriptor> = self.tools.values().map(|t| t.descriptor()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
