//! Document invariants - sanity checks that detect bugs.
//!
//! Every mutation performed through this crate preserves these. A violation
//! means either a bug or a lost update from a concurrent writer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::ScoringRules;
use crate::score;
use crate::state::{ChallengeStatus, Document, SessionStatus};

/// Invariant violation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

fn violation(message: String) -> InvariantViolation {
    InvariantViolation { message }
}

/// Check all document invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(doc: &Document) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (key, player) in &doc.players {
        if key != &player.username {
            violations.push(violation(format!(
                "Player stored under {key:?} has username {:?}",
                player.username
            )));
        }
    }

    // At most one pending challenge per unordered pair.
    let mut pending_pairs = BTreeSet::new();
    for challenge in doc.challenges.values() {
        if challenge.status != ChallengeStatus::Pending {
            continue;
        }
        let pair = if challenge.challenger <= challenge.challenged {
            (challenge.challenger.as_str(), challenge.challenged.as_str())
        } else {
            (challenge.challenged.as_str(), challenge.challenger.as_str())
        };
        if !pending_pairs.insert(pair) {
            violations.push(violation(format!(
                "More than one pending challenge between {} and {}",
                pair.0, pair.1
            )));
        }
        if challenge.expires_at < challenge.created_at {
            violations.push(violation(format!(
                "Challenge {} expires before it was created",
                challenge.id
            )));
        }
    }

    // A player is in at most one active session.
    let mut active: BTreeMap<&str, &str> = BTreeMap::new();
    for session in doc.game_sessions.values() {
        if session.players[0] == session.players[1] {
            violations.push(violation(format!(
                "Session {} pairs {} with themselves",
                session.id, session.players[0]
            )));
        }
        if session.choices.keys().any(|name| !session.has_player(name)) {
            violations.push(violation(format!(
                "Session {} holds a choice from a non-player",
                session.id
            )));
        }
        match session.status {
            SessionStatus::Active => {
                for name in &session.players {
                    if let Some(other) = active.insert(name.as_str(), session.id.as_str()) {
                        violations.push(violation(format!(
                            "Player {name} is active in both {other} and {}",
                            session.id
                        )));
                    }
                }
                if session.result.is_some() {
                    violations.push(violation(format!(
                        "Active session {} already has a result",
                        session.id
                    )));
                }
            }
            SessionStatus::Completed => {
                if session.choices.len() != 2 || session.result.is_none() {
                    violations.push(violation(format!(
                        "Completed session {} is missing choices or result",
                        session.id
                    )));
                }
            }
        }
    }

    // At most one queue entry per ordered pair.
    let mut queued = BTreeSet::new();
    for entry in &doc.waiting_queue {
        if !queued.insert((entry.waiting_player.as_str(), entry.target_player.as_str())) {
            violations.push(violation(format!(
                "Duplicate queue entry {} -> {}",
                entry.waiting_player, entry.target_player
            )));
        }
    }

    violations
}

/// Check that the cached leaderboard matches a fresh ranking of the players.
#[must_use]
pub fn check_leaderboard(doc: &Document, rules: &ScoringRules) -> Option<InvariantViolation> {
    let expected = score::rank(doc.players.values(), rules);
    (expected != doc.leaderboard)
        .then(|| violation("Cached leaderboard differs from player statistics".to_string()))
}
