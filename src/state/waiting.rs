//! Deferred challenge intents.

use serde::{Deserialize, Serialize};

/// A challenge that could not be delivered because the target was in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingQueueEntry {
    /// Unique id.
    pub id: String,
    /// Player who wants to challenge.
    pub waiting_player: String,
    /// Busy player being waited on.
    pub target_player: String,
    /// When the entry was queued.
    pub created_at: u64,
}

impl WaitingQueueEntry {
    /// Whether this entry is for the ordered pair (`waiting`, `target`).
    #[must_use]
    pub fn matches(&self, waiting: &str, target: &str) -> bool {
        self.waiting_player == waiting && self.target_player == target
    }

    /// Whether `username` is on either side of the entry.
    #[must_use]
    pub fn involves(&self, username: &str) -> bool {
        self.waiting_player == username || self.target_player == username
    }
}
