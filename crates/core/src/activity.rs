//! Activity snapshot seam for the user-context block.
//!
//! The context builder may include a light activity summary (e.g. unread
//! email count) in the system prompt. The source of that snapshot lives in
//! the tools crate; this trait keeps the dependency pointing inward.

use async_trait::async_trait;

use crate::tool::SessionContext;

/// A light snapshot of the user's current activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivitySnapshot {
    pub unread_messages: Option<usize>,
}

/// Provides an activity snapshot for the user-context block.
///
/// Implementations must tolerate failure silently: a missing snapshot is
/// never a user-visible error.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn snapshot(&self, ctx: &SessionContext) -> Option<ActivitySnapshot>;
}
