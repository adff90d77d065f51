//! Domain model structs persisted in the local chat database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use celeste_shared::ChatMessage;

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A stored chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Auto-assigned identifier, never reused.
    pub id: i64,
    /// Title derived from the first user message when the chat was created.
    pub title: String,
    /// Full transcript, oldest message first.
    pub history: Vec<ChatMessage>,
    /// When the chat was created. Never changes afterwards.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ChatSummary
// ---------------------------------------------------------------------------

/// Listing projection of a [`Chat`]: everything except the history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: i64,
    pub title: String,
}

impl From<&Chat> for ChatSummary {
    fn from(chat: &Chat) -> Self {
        Self {
            id: chat.id,
            title: chat.title.clone(),
        }
    }
}
