//! Event sink — ordered, terminal-aware delivery of stream events.
//!
//! Exactly one producer (the orchestrator) writes to a sink; exactly one
//! consumer (the wire) reads from it. After a terminal event or a wire
//! failure the sink is closed and further emits are silent no-ops, so the
//! orchestrator never has to unwind because a client went away.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use attache_core::event::StreamEvent;

/// Ordered sink for outbound events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver an event. No-op once the sink is closed.
    async fn emit(&self, event: StreamEvent);

    /// Whether the sink has been terminated.
    fn is_closed(&self) -> bool;
}

/// An [`EventSink`] backed by an mpsc channel.
///
/// The gateway owns the receiving half and adapts it into the SSE body.
pub struct ChannelSink {
    tx: mpsc::Sender<StreamEvent>,
    closed: AtomicBool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: StreamEvent) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let terminal = event.is_terminal();

        if self.tx.send(event).await.is_err() {
            // Receiver dropped (client disconnected). Abandon the stream.
            debug!("Event sink receiver gone; closing sink");
            self.closed.store(true, Ordering::Release);
            return;
        }

        if terminal {
            self.closed.store(true, Ordering::Release);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
