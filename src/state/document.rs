//! The root document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::{Challenge, GameSession, Player, WaitingQueueEntry};

/// One row of the derived leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: u32,
    /// Player.
    pub username: String,
    /// Computed score.
    pub score: u64,
    /// Rounded win percentage.
    pub win_rate: u32,
    /// Completed sessions.
    pub games_played: u32,
    /// Wins.
    pub wins: u32,
    /// Losses.
    pub losses: u32,
    /// Draws.
    pub draws: u32,
    /// Current win streak.
    pub win_streak: u32,
    /// Best win streak.
    pub best_streak: u32,
    /// Whether the player is online.
    pub is_online: bool,
}

/// The entire coordination state, always read and written whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    /// Players by username.
    pub players: BTreeMap<String, Player>,
    /// Cached ranking, reproducible from `players`.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Challenges by id.
    pub challenges: BTreeMap<String, Challenge>,
    /// Sessions by id.
    pub game_sessions: BTreeMap<String, GameSession>,
    /// Deferred challenges in insertion order.
    pub waiting_queue: Vec<WaitingQueueEntry>,
    /// Time of the last write, `None` before the first.
    pub last_updated: Option<u64>,
}

impl Document {
    /// The active session `username` plays in, if any.
    #[must_use]
    pub fn active_session_for(&self, username: &str) -> Option<&GameSession> {
        self.game_sessions
            .values()
            .find(|s| s.is_active() && s.has_player(username))
    }

    /// Whether `username` is in an active session.
    #[must_use]
    pub fn is_in_active_session(&self, username: &str) -> bool {
        self.active_session_for(username).is_some()
    }

    /// Whether any entity uses `id`.
    #[must_use]
    pub fn id_taken(&self, id: &str) -> bool {
        self.challenges.contains_key(id)
            || self.game_sessions.contains_key(id)
            || self.waiting_queue.iter().any(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_keys() {
        let json = serde_json::to_value(Document::default()).unwrap();
        for key in [
            "players",
            "leaderboard",
            "challenges",
            "gameSessions",
            "waitingQueue",
            "lastUpdated",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["lastUpdated"].is_null());
    }

    #[test]
    fn test_missing_collections_default() {
        let doc: Document = serde_json::from_str(r#"{"players": {}, "lastUpdated": 5}"#).unwrap();
        assert!(doc.waiting_queue.is_empty());
        assert_eq!(doc.last_updated, Some(5));
    }

    #[test]
    fn test_active_session_lookup() {
        let mut doc = Document::default();
        let mut done = GameSession::new("game_1_a", "alice", "bob", 1);
        done.status = crate::state::SessionStatus::Completed;
        doc.game_sessions.insert(done.id.clone(), done);
        assert!(!doc.is_in_active_session("alice"));

        let live = GameSession::new("game_2_b", "alice", "carol", 2);
        doc.game_sessions.insert(live.id.clone(), live);
        assert_eq!(
            doc.active_session_for("alice").map(|s| s.id.as_str()),
            Some("game_2_b")
        );
        assert!(doc.id_taken("game_1_a"));
        assert!(!doc.id_taken("game_3_c"));
    }
}
