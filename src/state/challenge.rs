//! Challenges between two players.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a challenge. Every status other than `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Awaiting the challenged player's answer.
    Pending,
    /// Accepted; a game session was created.
    Accepted,
    /// Declined by the challenged player.
    Rejected,
    /// Timed out.
    Expired,
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Accepted => "accepted",
            ChallengeStatus::Rejected => "rejected",
            ChallengeStatus::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// A proposal from one player to another to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Unique, creation-ordered id.
    pub id: String,
    /// Player who issued the challenge.
    pub challenger: String,
    /// Player addressed by the challenge.
    pub challenged: String,
    /// Current status.
    pub status: ChallengeStatus,
    /// Creation time.
    pub created_at: u64,
    /// `created_at` plus the challenge TTL.
    pub expires_at: u64,
    /// Session started by accepting this challenge.
    #[serde(default)]
    pub game_session_id: Option<String>,
}

impl Challenge {
    /// True when `now` is past the expiry time, whatever the stored status.
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }

    /// Pending and not yet expired.
    #[must_use]
    pub fn is_open_at(&self, now: u64) -> bool {
        self.status == ChallengeStatus::Pending && !self.is_expired_at(now)
    }

    /// True when the challenge is between `a` and `b` in either direction.
    #[must_use]
    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        (self.challenger == a && self.challenged == b)
            || (self.challenger == b && self.challenged == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge() -> Challenge {
        Challenge {
            id: "challenge_1_a".into(),
            challenger: "alice".into(),
            challenged: "bob".into(),
            status: ChallengeStatus::Pending,
            created_at: 1_000,
            expires_at: 2_000,
            game_session_id: None,
        }
    }

    #[test]
    fn test_expiry_is_strict() {
        let c = challenge();
        assert!(!c.is_expired_at(2_000));
        assert!(c.is_expired_at(2_001));
        assert!(c.is_open_at(2_000));
        assert!(!c.is_open_at(2_001));
    }

    #[test]
    fn test_unordered_pair() {
        let c = challenge();
        assert!(c.involves_pair("alice", "bob"));
        assert!(c.involves_pair("bob", "alice"));
        assert!(!c.involves_pair("alice", "carol"));
    }
}
