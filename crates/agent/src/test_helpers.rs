//! Shared test helpers: a scripted provider, a collecting sink, and a
//! small tool registry.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use attache_core::error::ProviderError;
use attache_core::event::StreamEvent;
use attache_core::provider::{ChatStreamRequest, LlmProvider, StreamChunk};
use attache_core::tool::{
    ActionKind, ParamSpec, ParameterSchema, SessionContext, Tool, ToolDescriptor, ToolRegistry,
    ToolResult, UsageHints,
};
use attache_core::widget::{WidgetBlock, WidgetType};
use attache_core::Domain;

use crate::sink::EventSink;

enum ScriptedBehavior {
    /// Return scripted raw replies, one per call. Panics when exhausted.
    Replies(Mutex<Vec<String>>),
    /// Probe reports unavailable.
    Unavailable,
    /// Every stream yields a single error.
    FailingStream(String),
}

/// A mock provider that streams a sequence of scripted replies.
pub struct ScriptedProvider {
    behavior: ScriptedBehavior,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ChatStreamRequest>>>,
}

impl ScriptedProvider {
    /// One raw reply per expected LLM invocation, in order.
    pub fn replies(replies: &[&str]) -> Self {
        Self::with_behavior(ScriptedBehavior::Replies(Mutex::new(
            replies.iter().rev().map(|s| s.to_string()).collect(),
        )))
    }

    /// A provider whose availability probe fails.
    pub fn unavailable() -> Self {
        Self::with_behavior(ScriptedBehavior::Unavailable)
    }

    /// A provider whose stream errors immediately.
    pub fn failing_stream(message: &str) -> Self {
        Self::with_behavior(ScriptedBehavior::FailingStream(message.to_string()))
    }

    fn with_behavior(behavior: ScriptedBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the stream-invocation counter.
    pub fn call_count_handle(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// Handle to the captured requests, for asserting on message lists.
    pub fn requests_handle(&self) -> Arc<Mutex<Vec<ChatStreamRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(
        &self,
        request: ChatStreamRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let (tx, rx) = tokio::sync::mpsc::channel(8);

        match &self.behavior {
            ScriptedBehavior::Replies(replies) => {
                let reply = replies
                    .lock()
                    .unwrap()
                    .pop()
                    .expect("ScriptedProvider: no more scripted replies");
                tokio::spawn(async move {
                    // Stream in two chunks to exercise accumulation
                    let mut mid = reply.len() / 2;
                    while !reply.is_char_boundary(mid) {
                        mid -= 1;
                    }
                    let (a, b) = reply.split_at(mid);
                    if !a.is_empty() {
                        let _ = tx.send(Ok(StreamChunk::content(a))).await;
                    }
                    if !b.is_empty() {
                        let _ = tx.send(Ok(StreamChunk::content(b))).await;
                    }
                    let _ = tx.send(Ok(StreamChunk::done())).await;
                });
            }
            ScriptedBehavior::Unavailable => {
                let _ = tx.send(Ok(StreamChunk::done())).await;
            }
            ScriptedBehavior::FailingStream(message) => {
                let message = message.clone();
                tokio::spawn(async move {
                    let _ = tx
                        .send(Err(ProviderError::StreamInterrupted(message)))
                        .await;
                });
            }
        }

        Ok(rx)
    }

    async fn is_available(&self) -> bool {
        !matches!(self.behavior, ScriptedBehavior::Unavailable)
    }
}

/// A sink that records every emit, including any after a terminal event,
/// so tests can assert the exactly-one-terminal invariant.
pub struct CollectingSink {
    events: Mutex<Vec<StreamEvent>>,
    closed: AtomicBool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: StreamEvent) {
        if event.is_terminal() {
            self.closed.store(true, Ordering::SeqCst);
        }
        self.events.lock().unwrap().push(event);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A fake email tool that returns two messages and one widget.
struct FakeFetch;

#[async_trait]
impl Tool for FakeFetch {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "fake_fetch".into(),
            description: "Fetch email messages (test stub)".into(),
            parameters: ParameterSchema::new(
                vec![ParamSpec::new("unreadOnly", "boolean", "Only unread mail")],
                &[],
            ),
            domain: Some(Domain::Email),
            hints: UsageHints::default(),
            kind: ActionKind::Api,
        }
    }

    async fn execute(&self, _args: &Map<String, Value>, _ctx: &SessionContext) -> ToolResult {
        let widget = WidgetBlock::new(
            WidgetType::EmailPreview,
            serde_json::json!({"from": "ana@example.com", "subject": "Quarterly numbers"}),
            &["reply", "archive", "open"],
        );
        ToolResult::ok_with_widgets(
            serde_json::json!({"messages": [
                {"from": "ana@example.com", "subject": "Quarterly numbers"},
                {"from": "leo@example.com", "subject": "Lunch?"}
            ]}),
            vec![widget],
        )
    }
}

/// Registry with the stub tools the orchestrator tests use.
pub fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FakeFetch));
    registry
}
