//! The agent orchestrator — the reason-and-act loop.
//!
//! One call, `process(request, sink)`, drives a whole turn: validate,
//! record the user turn, probe the LLM, assemble the prompt, then iterate
//! LLM → parse → tools → LLM until the model produces a final reply or the
//! iteration cap is hit. All outbound artifacts funnel through the sink,
//! which is owned by exactly this task; tool handlers only return values.
//!
//! Error policy (see the error taxonomy): tool failures and parse failures
//! are recovered locally and fed back to the LLM; only validation failures
//! and LLM-level failures terminate the turn with an `error` event.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use attache_core::activity::ActivitySource;
use attache_core::chat::ChatRequest;
use attache_core::conversation::{ConversationId, ConversationStore, Entry};
use attache_core::event::{ErrorCode, StreamEvent};
use attache_core::provider::{ChatMessage, ChatStreamRequest, LlmProvider};
use attache_core::tool::{SessionContext, ToolCall, ToolRegistry, ToolResult};

use crate::executor::ToolExecutor;
use crate::gating;
use crate::parser::ResponseParser;
use crate::prompts;
use crate::router::{AssemblyInput, PromptRouter};
use crate::sink::EventSink;
use crate::user_context::UserContextBuilder;
use crate::widgets::WidgetGenerator;

/// Tunables for the orchestrator, typically taken from `AppConfig`.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,

    /// Cap on LLM↔tool loop depth per turn
    pub max_iterations: u32,

    /// Most recent entries passed when history is included
    pub context_window_entries: usize,

    /// Optional delay between streamed words, to shape client animation
    pub word_delay: Option<Duration>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: 0.7,
            max_tokens: None,
            max_iterations: 5,
            context_window_entries: 10,
            word_delay: None,
        }
    }
}

/// The orchestrator. Read-only after construction; one `process` call per
/// request, each driving its own sink.
pub struct AgentOrchestrator {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    store: Arc<ConversationStore>,
    router: PromptRouter,
    parser: ResponseParser,
    executor: ToolExecutor,
    widgets: WidgetGenerator,
    user_context: Option<UserContextBuilder>,
    activity: Option<Arc<dyn ActivitySource>>,
    settings: OrchestratorSettings,
}

impl AgentOrchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        store: Arc<ConversationStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            executor: ToolExecutor::new(registry.clone()),
            registry,
            store,
            router: PromptRouter::new(),
            parser: ResponseParser::new(),
            widgets: WidgetGenerator::new(),
            user_context: None,
            activity: None,
            settings,
        }
    }

    /// Attach a user-context builder.
    pub fn with_user_context(mut self, builder: UserContextBuilder) -> Self {
        self.user_context = Some(builder);
        self
    }

    /// Attach an activity source for the user-context block.
    pub fn with_activity_source(mut self, source: Arc<dyn ActivitySource>) -> Self {
        self.activity = Some(source);
        self
    }

    /// Process one chat request, emitting events to the sink.
    ///
    /// Emits exactly one terminal event (`done` or `error`) per call.
    pub async fn process(&self, request: ChatRequest, sink: &dyn EventSink) {
        // ── Preconditions ──
        let Some(user_turn) = request.last_user_turn() else {
            sink.emit(StreamEvent::Error {
                message: "The last message must be a user turn".into(),
                code: ErrorCode::ValidationError,
            })
            .await;
            return;
        };
        let query = user_turn.content.clone();

        let conversation_id = request
            .conversation_id
            .as_deref()
            .map(ConversationId::from)
            .unwrap_or_default();

        info!(
            conversation_id = %conversation_id,
            query_len = query.len(),
            "Processing chat request"
        );

        self.store
            .append(&conversation_id, Entry::user(&query))
            .await;

        if !self.provider.is_available().await {
            sink.emit(StreamEvent::Error {
                message: "The language model is currently unreachable".into(),
                code: ErrorCode::LlmUnavailable,
            })
            .await;
            return;
        }

        // ── Session lending ──
        if request.session_info.is_none() {
            warn!("Request carries no session handle; API-backed tools will self-report");
        }
        let ctx = SessionContext::new(request.session_info.clone());

        // ── Context-inclusion gating ──
        let include_history = gating::should_include_history(&query);
        debug!(include_history, "Context gating decision");

        let history: Vec<ChatMessage> = if include_history {
            self.store
                .recent(&conversation_id, self.settings.context_window_entries)
                .await
                .iter()
                .map(|entry| match entry.role {
                    attache_core::chat::Role::User => ChatMessage::user(&entry.content),
                    attache_core::chat::Role::Assistant => {
                        ChatMessage::assistant(&entry.content)
                    }
                })
                .collect()
        } else {
            vec![ChatMessage::user(&query)]
        };

        // ── Prompt assembly ──
        let domains = self.router.detect_domains(&query);
        let tools = self.registry.by_domain(&domains);
        debug!(?domains, tools = tools.len(), "Intent detected");

        let user_context = match &self.user_context {
            Some(builder) => {
                let activity = match &self.activity {
                    Some(source) => source.snapshot(&ctx).await,
                    None => None,
                };
                Some(builder.build(Utc::now(), activity))
            }
            None => None,
        };

        let prompt = self.router.assemble(&AssemblyInput {
            query: &query,
            tools: &tools,
            user_context: user_context.as_deref(),
        });

        let is_summary = gating::is_summary_request(&query);

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(prompt));
        messages.extend(history);

        // ── Tool loop ──
        let mut all_call_ids: Vec<String> = Vec::new();

        for iteration in 0..self.settings.max_iterations {
            let status = if iteration == 0 {
                "Thinking..."
            } else {
                "Processing tool results..."
            };
            sink.emit(StreamEvent::Status {
                status: status.into(),
            })
            .await;

            let raw = match self.read_llm_stream(&messages, sink).await {
                Some(raw) => raw,
                None => return, // error already emitted
            };

            let parsed = self.parser.parse(&raw);

            if !parsed.tool_calls.is_empty() {
                let names: Vec<&str> =
                    parsed.tool_calls.iter().map(|c| c.name.as_str()).collect();
                info!(iteration, calls = ?names, "Dispatching tool calls");

                let results = self.executor.execute_many(&parsed.tool_calls, &ctx).await;
                all_call_ids.extend(results.iter().map(|(id, _)| id.clone()));

                if !is_summary {
                    for widget in self.widgets.from_tool_results(&results) {
                        sink.emit(StreamEvent::Widget { widget }).await;
                    }
                }

                let feedback = render_tool_feedback(&parsed.tool_calls, &results);
                messages.push(ChatMessage::assistant(&raw));
                messages.push(ChatMessage::user(feedback));
                continue;
            }

            // ── Final reply ──
            let mut text = parsed.response;
            if text.trim().is_empty() && iteration > 0 {
                text = prompts::EMPTY_RESULT_FALLBACK.into();
            }

            self.stream_text(&text, sink).await;

            for widget in self.widgets.from_llm_descriptors(&parsed.widgets) {
                sink.emit(StreamEvent::Widget { widget }).await;
            }

            self.store
                .append(
                    &conversation_id,
                    Entry::assistant(&text).with_tool_calls(all_call_ids),
                )
                .await;

            sink.emit(StreamEvent::Done).await;
            return;
        }

        // ── Iteration cap: apologize, end normally ──
        warn!(
            max_iterations = self.settings.max_iterations,
            "Iteration cap reached; ending turn with apology"
        );
        self.stream_text(prompts::ITERATION_CAP_APOLOGY, sink).await;
        self.store
            .append(
                &conversation_id,
                Entry::assistant(prompts::ITERATION_CAP_APOLOGY).with_tool_calls(all_call_ids),
            )
            .await;
        sink.emit(StreamEvent::Done).await;
    }

    /// Run one LLM stream to completion, accumulating content chunks.
    ///
    /// Returns `None` after emitting an `error` event on any stream-level
    /// failure.
    async fn read_llm_stream(
        &self,
        messages: &[ChatMessage],
        sink: &dyn EventSink,
    ) -> Option<String> {
        let request = ChatStreamRequest {
            model: self.settings.model.clone(),
            messages: messages.to_vec(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let mut rx = match self.provider.stream_chat(request).await {
            Ok(rx) => rx,
            Err(e) => {
                sink.emit(StreamEvent::Error {
                    message: format!("Language model request failed: {e}"),
                    code: ErrorCode::LlmError,
                })
                .await;
                return None;
            }
        };

        let mut raw = String::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(chunk) => {
                    if let Some(content) = chunk.content {
                        raw.push_str(&content);
                    }
                    if chunk.done {
                        break;
                    }
                }
                Err(e) => {
                    sink.emit(StreamEvent::Error {
                        message: format!("Language model stream failed: {e}"),
                        code: ErrorCode::LlmError,
                    })
                    .await;
                    return None;
                }
            }
        }

        Some(raw)
    }

    /// Stream final text word by word, preserving whitespace.
    async fn stream_text(&self, text: &str, sink: &dyn EventSink) {
        for token in split_words(text) {
            sink.emit(StreamEvent::TextDelta {
                content: token.to_string(),
            })
            .await;
            if let Some(delay) = self.settings.word_delay {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Split text into word tokens, each carrying its trailing whitespace, so
/// that concatenating the tokens reproduces the input exactly.
fn split_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut in_whitespace = bytes.first().is_some_and(|b| b.is_ascii_whitespace());

    for (i, c) in text.char_indices() {
        let ws = c.is_whitespace();
        // A token ends where whitespace turns back into a word character
        if in_whitespace && !ws {
            tokens.push(&text[start..i]);
            start = i;
        }
        in_whitespace = ws;
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Render the synthesized user message carrying tool results back to the
/// LLM, one block per call.
fn render_tool_feedback(calls: &[ToolCall], results: &[(String, ToolResult)]) -> String {
    let mut blocks = Vec::with_capacity(results.len() + 1);
    for (call, (_, result)) in calls.iter().zip(results.iter()) {
        if result.success {
            let data = result.data.clone().unwrap_or(serde_json::Value::Null);
            let pretty =
                serde_json::to_string_pretty(&data).unwrap_or_else(|_| "null".to_string());
            blocks.push(format!("Tool \"{}\" returned: {pretty}", call.name));
        } else {
            let error = result.error.as_deref().unwrap_or("unknown error");
            blocks.push(format!("Tool \"{}\" failed: {error}", call.name));
        }
    }
    blocks.push(prompts::TOOL_RESULTS_INSTRUCTION.to_string());
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use attache_core::chat::{SessionHandle, Turn};
    use attache_core::tool::Domain;

    fn request(query: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![Turn::user(query)],
            conversation_id: Some("conv-test".into()),
            session_info: Some(SessionHandle {
                session: "tok".into(),
                base_url: None,
                cluster_id: None,
            }),
        }
    }

    fn orchestrator(provider: ScriptedProvider) -> AgentOrchestrator {
        let registry = Arc::new(test_registry());
        let store = Arc::new(ConversationStore::new(50));
        AgentOrchestrator::new(
            Arc::new(provider),
            registry,
            store,
            OrchestratorSettings::default(),
        )
    }

    fn collect_text(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    fn terminal_count(events: &[StreamEvent]) -> usize {
        events.iter().filter(|e| e.is_terminal()).count()
    }

    // ── split_words ──

    #[test]
    fn split_words_preserves_whitespace() {
        let text = "Hello  world,\nthis is  it.";
        let tokens = split_words(text);
        assert_eq!(tokens.concat(), text);
        assert_eq!(tokens[0], "Hello  ");
    }

    #[test]
    fn split_words_handles_leading_whitespace() {
        let text = "  leading";
        assert_eq!(split_words(text).concat(), text);
    }

    #[test]
    fn split_words_empty() {
        assert!(split_words("").is_empty());
    }

    // ── Scenario: empathy path, no tools ──

    #[tokio::test]
    async fn empathy_path_streams_text_and_done() {
        let provider = ScriptedProvider::replies(&[
            r#"{"response": "I'm sorry to hear that. Rest up, and let me know if I can lighten your day."}"#,
        ]);
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator
            .process(request("not feeling well today"), &sink)
            .await;

        let events = sink.events();
        assert!(collect_text(&events).contains("sorry to hear"));
        assert_eq!(terminal_count(&events), 1);
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
        // No widgets on the empathy path
        assert!(!events
            .iter()
            .any(|e| matches!(e, StreamEvent::Widget { .. })));
    }

    // ── Scenario: unread inbox with tool call and widgets ──

    #[tokio::test]
    async fn tool_call_emits_widgets_then_reply() {
        let provider = ScriptedProvider::replies(&[
            r#"{"tool_calls": [{"name": "fake_fetch", "arguments": {"unreadOnly": true}}],
                "response": ""}"#,
            r#"{"response": "You have 2 unread emails."}"#,
        ]);
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator.process(request("any unread messages"), &sink).await;

        let events = sink.events();
        let widget_count = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Widget { .. }))
            .count();
        assert_eq!(widget_count, 1);
        assert!(collect_text(&events).contains("2 unread emails"));
        assert_eq!(terminal_count(&events), 1);

        // Widgets precede the text deltas of the final reply
        let widget_at = events
            .iter()
            .position(|e| matches!(e, StreamEvent::Widget { .. }))
            .unwrap();
        let first_text = events
            .iter()
            .position(|e| matches!(e, StreamEvent::TextDelta { .. }))
            .unwrap();
        assert!(widget_at < first_text);
    }

    // ── Scenario: summary suppression ──

    #[tokio::test]
    async fn summary_request_suppresses_tool_widgets() {
        let provider = ScriptedProvider::replies(&[
            r#"{"tool_calls": [{"name": "fake_fetch", "arguments": {}}], "response": ""}"#,
            r#"{"response": "Here is the rundown of today's mail."}"#,
        ]);
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator
            .process(request("give me a summary of today's emails"), &sink)
            .await;

        let events = sink.events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, StreamEvent::Widget { .. })));
        assert!(collect_text(&events).contains("rundown"));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    // ── Scenario: iteration cap ──

    #[tokio::test]
    async fn iteration_cap_apologizes_without_error() {
        // Always emits a tool call; never a final answer
        let looping = r#"{"tool_calls": [{"name": "fake_fetch", "arguments": {}}], "response": ""}"#;
        let provider = ScriptedProvider::replies(&[looping; 5]);
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator.process(request("any unread messages"), &sink).await;

        let events = sink.events();
        assert!(collect_text(&events).contains("sorry"));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
        assert!(!events
            .iter()
            .any(|e| matches!(e, StreamEvent::Error { .. })));
    }

    #[tokio::test]
    async fn llm_invocations_bounded_by_max_iterations() {
        let looping = r#"{"tool_calls": [{"name": "fake_fetch", "arguments": {}}], "response": ""}"#;
        let provider = ScriptedProvider::replies(&[looping; 10]);
        let calls = provider.call_count_handle();
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator.process(request("any unread messages"), &sink).await;

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn no_tool_calls_means_single_llm_invocation() {
        let provider = ScriptedProvider::replies(&[r#"{"response": "Just text."}"#]);
        let calls = provider.call_count_handle();
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator.process(request("hello there friend"), &sink).await;

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    // ── Preconditions ──

    #[tokio::test]
    async fn last_turn_must_be_user() {
        let provider = ScriptedProvider::replies(&[]);
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        let bad = ChatRequest {
            messages: vec![Turn::user("hi"), Turn::assistant("hello")],
            conversation_id: None,
            session_info: None,
        };
        orchestrator.process(bad, &sink).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::Error {
                code: ErrorCode::ValidationError,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unavailable_llm_reports_error() {
        let provider = ScriptedProvider::unavailable();
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator.process(request("hello"), &sink).await;

        let events = sink.events();
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error {
                code: ErrorCode::LlmUnavailable,
                ..
            })
        ));
        assert_eq!(terminal_count(&events), 1);
    }

    #[tokio::test]
    async fn stream_error_terminates_turn() {
        let provider = ScriptedProvider::failing_stream("connection reset");
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator.process(request("hello"), &sink).await;

        let events = sink.events();
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error {
                code: ErrorCode::LlmError,
                ..
            })
        ));
        assert_eq!(terminal_count(&events), 1);
    }

    // ── Post-tool empty reply fallback ──

    #[tokio::test]
    async fn empty_post_tool_reply_substituted() {
        let provider = ScriptedProvider::replies(&[
            r#"{"tool_calls": [{"name": "fake_fetch", "arguments": {}}], "response": ""}"#,
            r#"{"response": ""}"#,
        ]);
        let orchestrator = orchestrator(provider);
        let sink = CollectingSink::new();

        orchestrator.process(request("any unread messages"), &sink).await;

        assert!(collect_text(&sink.events()).contains("couldn't find any matching results"));
    }

    // ── Context-inclusion gating, end to end ──

    #[tokio::test]
    async fn follow_up_query_includes_history() {
        let provider =
            ScriptedProvider::replies(&[r#"{"response": "Maria is organizing it."}"#]);
        let requests = provider.requests_handle();
        let registry = Arc::new(test_registry());
        let store = Arc::new(ConversationStore::new(50));
        let id = ConversationId::from("conv-test");
        store
            .append(&id, Entry::user("when is the design review?"))
            .await;
        store
            .append(
                &id,
                Entry::assistant("The design review is Tuesday at 10, organized by Maria."),
            )
            .await;

        let orchestrator = AgentOrchestrator::new(
            Arc::new(provider),
            registry,
            store,
            OrchestratorSettings::default(),
        );
        let sink = CollectingSink::new();
        orchestrator
            .process(request("who's organizing it?"), &sink)
            .await;

        let requests = requests.lock().unwrap();
        let messages = &requests[0].messages;
        assert!(messages
            .iter()
            .any(|m| m.content.contains("design review is Tuesday")));
        assert_eq!(messages.last().unwrap().content, "who's organizing it?");
    }

    #[tokio::test]
    async fn standalone_query_omits_history() {
        let provider = ScriptedProvider::replies(&[r#"{"response": "Here they are."}"#]);
        let requests = provider.requests_handle();
        let registry = Arc::new(test_registry());
        let store = Arc::new(ConversationStore::new(50));
        let id = ConversationId::from("conv-test");
        store.append(&id, Entry::user("prior question")).await;
        store.append(&id, Entry::assistant("prior answer")).await;

        let orchestrator = AgentOrchestrator::new(
            Arc::new(provider),
            registry,
            store,
            OrchestratorSettings::default(),
        );
        let sink = CollectingSink::new();
        orchestrator.process(request("show emails"), &sink).await;

        let requests = requests.lock().unwrap();
        let messages = &requests[0].messages;
        // Just the system prompt and the current user turn
        assert_eq!(messages.len(), 2);
        assert!(!messages.iter().any(|m| m.content.contains("prior answer")));
    }

    // ── Conversation recording ──

    #[tokio::test]
    async fn turns_recorded_in_store() {
        let provider = ScriptedProvider::replies(&[r#"{"response": "Recorded."}"#]);
        let registry = Arc::new(test_registry());
        let store = Arc::new(ConversationStore::new(50));
        let orchestrator = AgentOrchestrator::new(
            Arc::new(provider),
            registry,
            store.clone(),
            OrchestratorSettings::default(),
        );
        let sink = CollectingSink::new();

        orchestrator.process(request("hello there"), &sink).await;

        let id = ConversationId::from("conv-test");
        let entries = store.all(&id).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "hello there");
        assert_eq!(entries[1].content, "Recorded.");
    }

    // ── Tool feedback rendering ──

    #[test]
    fn feedback_renders_success_and_failure() {
        let calls = vec![
            ToolCall {
                id: "c1".into(),
                name: "fetch_messages".into(),
                arguments: serde_json::Map::new(),
            },
            ToolCall {
                id: "c2".into(),
                name: "search_messages".into(),
                arguments: serde_json::Map::new(),
            },
        ];
        let results = vec![
            (
                "c1".to_string(),
                ToolResult::ok(serde_json::json!({"count": 0})),
            ),
            ("c2".to_string(), ToolResult::fail("upstream 503")),
        ];
        let feedback = render_tool_feedback(&calls, &results);
        assert!(feedback.contains("Tool \"fetch_messages\" returned:"));
        assert!(feedback.contains("\"count\": 0"));
        assert!(feedback.contains("Tool \"search_messages\" failed: upstream 503"));
        assert!(feedback.contains("tell the user clearly"));
    }

    // ── Domain plumbing sanity ──

    #[test]
    fn email_query_offers_email_tools() {
        let registry = test_registry();
        let descriptors = registry.by_domain(&[Domain::Email]);
        assert!(descriptors.iter().any(|d| d.name == "fake_fetch"));
    }
}
