//! Conversation history — per-conversation turn log with FIFO pruning.
//!
//! Conversations are process-local and in-memory. The store is safe for
//! concurrent access to *distinct* conversation ids; clients are expected
//! to serialize requests within a single conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::chat::Role;

/// Maximum number of in-memory conversations before the oldest are evicted.
const MAX_CONVERSATIONS: usize = 1_000;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single recorded turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Who produced this entry
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the entry was appended
    pub timestamp: DateTime<Utc>,

    /// Ids of tool calls made while producing this entry (assistant only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<String>,
}

impl Entry {
    /// Create a user entry.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant entry.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
        }
    }

    /// Attach tool-call references to this entry.
    pub fn with_tool_calls(mut self, ids: Vec<String>) -> Self {
        self.tool_calls = ids;
        self
    }
}

/// An ordered, append-only sequence of entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation id
    pub id: ConversationId,

    /// Ordered entries, oldest first
    pub entries: Vec<Entry>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last entry was appended
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            entries: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Rough token estimate (4 chars ≈ 1 token). Advisory only; pruning is
    /// by entry count, not tokens.
    pub fn estimated_tokens(&self) -> usize {
        self.entries.iter().map(|e| e.content.len() / 4).sum()
    }
}

/// Process-wide conversation store with FIFO pruning.
pub struct ConversationStore {
    max_entries: usize,
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    /// Create a store that prunes each conversation to `max_entries`.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Append an entry, creating the conversation if absent.
    ///
    /// Prunes from the front until the conversation holds at most
    /// `max_entries` entries. Pruning never reorders.
    pub async fn append(&self, id: &ConversationId, entry: Entry) {
        let mut conversations = self.conversations.write().await;

        // Evict the least-recently-active conversation if at capacity
        if conversations.len() >= MAX_CONVERSATIONS && !conversations.contains_key(&id.0) {
            if let Some(oldest_key) = conversations
                .iter()
                .min_by_key(|(_, c)| c.last_activity)
                .map(|(k, _)| k.clone())
            {
                conversations.remove(&oldest_key);
            }
        }

        let conv = conversations
            .entry(id.0.clone())
            .or_insert_with(|| Conversation::new(id.clone()));

        conv.last_activity = Utc::now();
        conv.entries.push(entry);

        if conv.entries.len() > self.max_entries {
            let overflow = conv.entries.len() - self.max_entries;
            conv.entries.drain(..overflow);
        }
    }

    /// The last `n` entries (fewer if the conversation is shorter).
    pub async fn recent(&self, id: &ConversationId, n: usize) -> Vec<Entry> {
        let conversations = self.conversations.read().await;
        match conversations.get(&id.0) {
            Some(conv) => {
                let start = conv.entries.len().saturating_sub(n);
                conv.entries[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// The full ordered entry list.
    pub async fn all(&self, id: &ConversationId) -> Vec<Entry> {
        let conversations = self.conversations.read().await;
        conversations
            .get(&id.0)
            .map(|c| c.entries.clone())
            .unwrap_or_default()
    }

    /// Number of entries in a conversation.
    pub async fn len(&self, id: &ConversationId) -> usize {
        let conversations = self.conversations.read().await;
        conversations.get(&id.0).map(|c| c.entries.len()).unwrap_or(0)
    }

    /// Remove a single conversation.
    pub async fn clear(&self, id: &ConversationId) {
        self.conversations.write().await.remove(&id.0);
    }

    /// Remove all conversations.
    pub async fn clear_all(&self) {
        self.conversations.write().await.clear();
    }
}
