//! Two-player game sessions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::state::{Choice, Outcome};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Waiting for choices.
    Active,
    /// Both players chose and the round was resolved.
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => f.write_str("active"),
            SessionStatus::Completed => f.write_str("completed"),
        }
    }
}

/// A rematch proposal attached to a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRequest {
    /// Challenge issued for the rematch.
    pub challenge_id: String,
    /// Player asking for the rematch.
    pub from: String,
    /// Opponent who may accept or decline.
    pub to: String,
    /// When the request was made.
    #[serde(rename = "timestamp", alias = "requestedAt")]
    pub requested_at: u64,
}

/// One round between two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    /// Unique id.
    pub id: String,
    /// Challenger first, challenged second.
    pub players: [String; 2],
    /// Current status.
    pub status: SessionStatus,
    /// Submitted choices, at most one per player.
    #[serde(default)]
    pub choices: BTreeMap<String, Choice>,
    /// Per-player outcome, set on completion.
    #[serde(default)]
    pub result: Option<BTreeMap<String, Outcome>>,
    /// Winning username, `None` for a draw or an unresolved session.
    #[serde(default)]
    pub winner: Option<String>,
    /// Creation time.
    pub created_at: u64,
    /// Completion time.
    #[serde(default)]
    pub completed_at: Option<u64>,
    /// Pending rematch proposal, if any.
    #[serde(
        default,
        rename = "replayChallenge",
        alias = "replayRequest",
        skip_serializing_if = "Option::is_none"
    )]
    pub replay_request: Option<ReplayRequest>,
}

impl GameSession {
    /// A new active session with no choices.
    #[must_use]
    pub fn new(id: impl Into<String>, first: impl Into<String>, second: impl Into<String>, now: u64) -> Self {
        Self {
            id: id.into(),
            players: [first.into(), second.into()],
            status: SessionStatus::Active,
            choices: BTreeMap::new(),
            result: None,
            winner: None,
            created_at: now,
            completed_at: None,
            replay_request: None,
        }
    }

    /// Whether `username` plays in this session.
    #[must_use]
    pub fn has_player(&self, username: &str) -> bool {
        self.players.iter().any(|p| p == username)
    }

    /// The other player, if `username` plays in this session.
    #[must_use]
    pub fn opponent_of(&self, username: &str) -> Option<&str> {
        match &self.players {
            [a, b] if a == username => Some(b.as_str()),
            [a, b] if b == username => Some(a.as_str()),
            _ => None,
        }
    }

    /// Whether the session is still waiting for choices.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_lookup() {
        let session = GameSession::new("game_1_a", "alice", "bob", 10);
        assert_eq!(session.opponent_of("alice"), Some("bob"));
        assert_eq!(session.opponent_of("bob"), Some("alice"));
        assert_eq!(session.opponent_of("carol"), None);
        assert!(session.is_active());
    }

    #[test]
    fn test_json_omits_absent_replay() {
        let session = GameSession::new("game_1_a", "alice", "bob", 10);
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("replayChallenge").is_none());
        assert_eq!(json["players"][1], "bob");
        assert_eq!(json["status"], "active");
        assert!(json["winner"].is_null());
    }

    #[test]
    fn test_replay_pin_json_keys() {
        let mut session = GameSession::new("game_1_a", "alice", "bob", 10);
        session.replay_request = Some(ReplayRequest {
            challenge_id: "challenge_20_b".into(),
            from: "alice".into(),
            to: "bob".into(),
            requested_at: 20,
        });
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["replayChallenge"]["challengeId"], "challenge_20_b");
        assert_eq!(json["replayChallenge"]["timestamp"], 20);
        assert!(json.get("replayRequest").is_none());

        let legacy = r#"{"challengeId":"c","from":"a","to":"b","requestedAt":7}"#;
        let pin: ReplayRequest = serde_json::from_str(legacy).unwrap();
        assert_eq!(pin.requested_at, 7);
    }
}
