//! HTTP gateway for Attache.
//!
//! Endpoints:
//! - `POST /chat`   — send a chat request, receive the event stream
//! - `GET  /health` — agent liveness, LLM reachability, registered tools
//!
//! Built on Axum. Each chat request gets its own channel-backed sink; the
//! orchestrator runs in a spawned task and the receiving half becomes the
//! SSE body. If the client disconnects, the receiver drops, the sink
//! closes, and the orchestrator's remaining writes become no-ops.

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::Json,
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use attache_agent::{AgentOrchestrator, ChannelSink, OrchestratorSettings, UserContextBuilder};
use attache_config::AppConfig;
use attache_core::chat::ChatRequest;
use attache_core::conversation::ConversationStore;
use attache_core::provider::LlmProvider;
use attache_core::tool::ToolRegistry;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<AgentOrchestrator>,
    pub provider: Arc<dyn LlmProvider>,
    pub registry: Arc<ToolRegistry>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server with everything wired from config.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if config.use_mock_agent {
        warn!("use_mock_agent is set but the scenario engine is not compiled in; serving the live agent");
    }

    let provider = attache_providers::build_from_config(&config);
    let api_client = attache_tools::build_api_client(&config);
    let registry = Arc::new(attache_tools::default_registry(api_client.clone()));
    let store = Arc::new(ConversationStore::new(config.max_history_entries));

    let settings = OrchestratorSettings {
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
        max_iterations: config.max_iterations,
        context_window_entries: config.context_window_entries,
        word_delay: Some(std::time::Duration::from_millis(12)),
    };

    let mut orchestrator =
        AgentOrchestrator::new(provider.clone(), registry.clone(), store, settings);
    if config.user_context.enabled {
        let uc = &config.user_context;
        orchestrator = orchestrator
            .with_user_context(UserContextBuilder::new(
                uc.email.clone(),
                uc.display_name.clone(),
                &uc.timezone,
                &uc.tz_abbrev,
                uc.utc_offset_minutes,
            ))
            .with_activity_source(Arc::new(attache_tools::email::EmailActivitySource::new(
                api_client,
            )));
    }

    let state = Arc::new(GatewayState {
        orchestrator: Arc::new(orchestrator),
        provider,
        registry,
    });

    let app = build_router(state);

    info!(%addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `POST /chat` — run one turn, streaming events back as SSE.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    info!(
        turns = request.messages.len(),
        has_session = request.session_info.is_some(),
        "chat request"
    );

    let (tx, rx) = tokio::sync::mpsc::channel(64);
    let orchestrator = state.orchestrator.clone();

    tokio::spawn(async move {
        let sink = ChannelSink::new(tx);
        orchestrator.process(request, &sink).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    llm_available: bool,
    tools: Vec<String>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let llm_available = state.provider.is_available().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm_available,
        tools: state.registry.names(),
    })
}
