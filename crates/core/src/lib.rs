//! # Attache Core
//!
//! Domain types, traits, and error definitions for the Attache agent backend.
//! This crate defines the domain model that all other crates implement
//! against: chat requests, conversations, tools, widgets, stream events,
//! and the LLM provider seam.
//!
//! ## Design Philosophy
//!
//! Every subsystem boundary is defined as a trait here. Implementations live
//! in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod activity;
pub mod chat;
pub mod conversation;
pub mod error;
pub mod event;
pub mod provider;
pub mod tool;
pub mod widget;

// Re-export key types at crate root for ergonomics
pub use activity::{ActivitySnapshot, ActivitySource};
pub use chat::{ChatRequest, Role, SessionHandle, Turn, WidgetAction};
pub use conversation::{Conversation, ConversationId, ConversationStore, Entry};
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{ErrorCode, StreamEvent};
pub use provider::{ChatMessage, ChatStreamRequest, LlmProvider, MessageRole, StreamChunk};
pub use tool::{
    ActionKind, Domain, ParamSpec, ParameterSchema, SessionContext, Tool, ToolCall,
    ToolDescriptor, ToolOutput, ToolRegistry, ToolResult, UsageHints,
};
pub use widget::{VdomChild, VdomNode, WidgetBlock, WidgetDescriptor, WidgetType};
