//! Challenge lifecycle: `pending -> accepted | rejected | expired`.
//!
//! Expiry is time-based and checked lazily: `accept` refuses a challenge whose
//! `expires_at` has passed even if its status still reads `pending`. Only
//! [`sweep_expired`] removes such challenges from the document.

use tracing::{debug, info};

use crate::error::{LobbyError, LobbyResult};
use crate::ids::{self, IdKind};
use crate::matchmaking;
use crate::session;
use crate::state::{Challenge, ChallengeStatus, Document, WaitingQueueEntry};

/// What `create` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// A pending challenge was created.
    Issued(Challenge),
    /// The target was in a game; the challenger waits in the target's queue.
    Queued {
        /// The queue entry (new or pre-existing).
        entry: WaitingQueueEntry,
        /// False when an identical entry was already queued.
        newly_queued: bool,
    },
}

impl ChallengeOutcome {
    /// The issued challenge, or [`LobbyError::TargetBusy`] if the request was
    /// queued instead.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::TargetBusy`] for a queued outcome.
    pub fn into_challenge(self) -> LobbyResult<Challenge> {
        match self {
            ChallengeOutcome::Issued(challenge) => Ok(challenge),
            ChallengeOutcome::Queued {
                entry,
                newly_queued,
            } => Err(LobbyError::TargetBusy {
                target: entry.target_player,
                newly_queued,
            }),
        }
    }

    /// The issued challenge, if any.
    #[must_use]
    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            ChallengeOutcome::Issued(challenge) => Some(challenge),
            ChallengeOutcome::Queued { .. } => None,
        }
    }
}

/// Result of accepting a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedChallenge {
    /// The challenge, now `accepted`.
    pub challenge: Challenge,
    /// Session created for it.
    pub game_session_id: String,
}

/// Issue a challenge from `challenger` to `challenged`.
///
/// If `challenged` is in an active session, no challenge is created: the
/// challenger is queued behind the target and a [`ChallengeOutcome::Queued`]
/// is returned so the queue insertion is persisted by the caller.
///
/// # Errors
///
/// Returns [`LobbyError::SelfChallenge`], [`LobbyError::PlayerNotFound`],
/// [`LobbyError::PlayerOffline`] or [`LobbyError::ChallengeAlreadyExists`].
pub fn create(
    doc: &mut Document,
    challenger: &str,
    challenged: &str,
    now: u64,
    ttl_ms: u64,
) -> LobbyResult<ChallengeOutcome> {
    if challenger == challenged {
        return Err(LobbyError::SelfChallenge(challenger.to_string()));
    }
    for name in [challenger, challenged] {
        match doc.players.get(name) {
            None => return Err(LobbyError::PlayerNotFound(name.to_string())),
            Some(p) if !p.is_online => return Err(LobbyError::PlayerOffline(name.to_string())),
            Some(_) => {}
        }
    }

    if doc.is_in_active_session(challenged) {
        let (entry, newly_queued) = matchmaking::enqueue(doc, challenger, challenged, now);
        info!(challenger, challenged, newly_queued, "target busy; challenge queued");
        return Ok(ChallengeOutcome::Queued {
            entry,
            newly_queued,
        });
    }

    if pending_between(doc, challenger, challenged).is_some() {
        return Err(LobbyError::ChallengeAlreadyExists {
            challenger: challenger.to_string(),
            challenged: challenged.to_string(),
        });
    }

    let id = ids::generate(IdKind::Challenge, now, |id| doc.id_taken(id));
    let challenge = Challenge {
        id: id.clone(),
        challenger: challenger.to_string(),
        challenged: challenged.to_string(),
        status: ChallengeStatus::Pending,
        created_at: now,
        expires_at: now.saturating_add(ttl_ms),
        game_session_id: None,
    };
    doc.challenges.insert(id, challenge.clone());
    info!(challenge = %challenge.id, challenger, challenged, "challenge issued");
    Ok(ChallengeOutcome::Issued(challenge))
}

/// The pending challenge between `a` and `b` in either direction.
///
/// A pending challenge past its expiry still counts until it is swept, which
/// keeps at most one pending challenge per unordered pair in the document.
#[must_use]
pub fn pending_between<'a>(doc: &'a Document, a: &str, b: &str) -> Option<&'a Challenge> {
    doc.challenges
        .values()
        .find(|c| c.status == ChallengeStatus::Pending && c.involves_pair(a, b))
}

fn addressed_pending<'a>(
    doc: &'a mut Document,
    challenge_id: &str,
    acting_user: &str,
) -> LobbyResult<&'a mut Challenge> {
    let challenge = doc
        .challenges
        .get_mut(challenge_id)
        .ok_or_else(|| LobbyError::ChallengeNotFound(challenge_id.to_string()))?;
    if challenge.challenged != acting_user {
        return Err(LobbyError::NotChallenged {
            challenge_id: challenge_id.to_string(),
            user: acting_user.to_string(),
        });
    }
    if challenge.status != ChallengeStatus::Pending {
        return Err(LobbyError::NotPending {
            challenge_id: challenge_id.to_string(),
            status: challenge.status,
        });
    }
    Ok(challenge)
}

/// Accept a challenge on behalf of `acting_user` and start its session.
///
/// # Errors
///
/// Returns [`LobbyError::ChallengeNotFound`], [`LobbyError::NotChallenged`],
/// [`LobbyError::NotPending`], [`LobbyError::ChallengeExpired`],
/// [`LobbyError::PlayerNotFound`] if either player left, or
/// [`LobbyError::PlayerInSession`] if either is already playing.
pub fn accept(
    doc: &mut Document,
    challenge_id: &str,
    acting_user: &str,
    now: u64,
) -> LobbyResult<AcceptedChallenge> {
    let challenge = addressed_pending(doc, challenge_id, acting_user)?;
    if challenge.is_expired_at(now) {
        return Err(LobbyError::ChallengeExpired(challenge_id.to_string()));
    }
    let challenger = challenge.challenger.clone();
    let challenged = challenge.challenged.clone();

    for name in [&challenger, &challenged] {
        if !doc.players.contains_key(name.as_str()) {
            return Err(LobbyError::PlayerNotFound(name.clone()));
        }
        if doc.is_in_active_session(name) {
            return Err(LobbyError::PlayerInSession(name.clone()));
        }
    }

    let game_session_id = session::create_session(doc, &challenger, &challenged, now);
    let challenge = doc
        .challenges
        .get_mut(challenge_id)
        .ok_or_else(|| LobbyError::ChallengeNotFound(challenge_id.to_string()))?;
    challenge.status = ChallengeStatus::Accepted;
    challenge.game_session_id = Some(game_session_id.clone());
    info!(challenge = challenge_id, session = %game_session_id, "challenge accepted");

    Ok(AcceptedChallenge {
        challenge: challenge.clone(),
        game_session_id,
    })
}

/// Decline a challenge on behalf of `acting_user`.
///
/// # Errors
///
/// Returns [`LobbyError::ChallengeNotFound`], [`LobbyError::NotChallenged`]
/// or [`LobbyError::NotPending`].
pub fn reject(doc: &mut Document, challenge_id: &str, acting_user: &str) -> LobbyResult<Challenge> {
    let challenge = addressed_pending(doc, challenge_id, acting_user)?;
    challenge.status = ChallengeStatus::Rejected;
    info!(challenge = challenge_id, "challenge rejected");
    Ok(challenge.clone())
}

/// Remove pending challenges whose expiry has passed. Returns how many.
pub fn sweep_expired(doc: &mut Document, now: u64) -> usize {
    let before = doc.challenges.len();
    doc.challenges
        .retain(|_, c| !(c.status == ChallengeStatus::Pending && c.is_expired_at(now)));
    let removed = before - doc.challenges.len();
    if removed > 0 {
        debug!(removed, "expired challenges swept");
    }
    removed
}

/// Open challenges addressed to `username`, oldest first.
#[must_use]
pub fn pending_for<'a>(doc: &'a Document, username: &str, now: u64) -> Vec<&'a Challenge> {
    let mut pending: Vec<&Challenge> = doc
        .challenges
        .values()
        .filter(|c| c.challenged == username && c.is_open_at(now))
        .collect();
    pending.sort_by_key(|c| c.created_at);
    pending
}

/// Open challenges issued by `username`, oldest first.
#[must_use]
pub fn outgoing_for<'a>(doc: &'a Document, username: &str, now: u64) -> Vec<&'a Challenge> {
    let mut outgoing: Vec<&Challenge> = doc
        .challenges
        .values()
        .filter(|c| c.challenger == username && c.is_open_at(now))
        .collect();
    outgoing.sort_by_key(|c| c.created_at);
    outgoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringRules;
    use crate::registry;

    const TTL: u64 = 120_000;

    fn lobby(names: &[&str]) -> Document {
        let mut doc = Document::default();
        for name in names {
            registry::register(&mut doc, name, "instance_0_x", 0, &ScoringRules::default()).unwrap();
        }
        doc
    }

    fn issue(doc: &mut Document, from: &str, to: &str, now: u64) -> Challenge {
        create(doc, from, to, now, TTL).unwrap().into_challenge().unwrap()
    }

    #[test]
    fn test_create_sets_expiry() {
        let mut doc = lobby(&["alice", "bob"]);
        let c = issue(&mut doc, "alice", "bob", 1_000);
        assert_eq!(c.status, ChallengeStatus::Pending);
        assert_eq!(c.expires_at, 1_000 + TTL);
        assert!(c.id.starts_with("challenge_1000_"));
    }

    #[test]
    fn test_create_validation_order() {
        let mut doc = lobby(&["alice", "bob"]);
        assert_eq!(
            create(&mut doc, "alice", "zed", 0, TTL),
            Err(LobbyError::PlayerNotFound("zed".into()))
        );
        doc.players.get_mut("bob").unwrap().is_online = false;
        assert_eq!(
            create(&mut doc, "alice", "bob", 0, TTL),
            Err(LobbyError::PlayerOffline("bob".into()))
        );
        assert!(matches!(
            create(&mut doc, "alice", "alice", 0, TTL),
            Err(LobbyError::SelfChallenge(_))
        ));
    }

    #[test]
    fn test_duplicate_pending_either_direction() {
        let mut doc = lobby(&["alice", "bob"]);
        issue(&mut doc, "alice", "bob", 0);
        assert!(matches!(
            create(&mut doc, "alice", "bob", 1, TTL),
            Err(LobbyError::ChallengeAlreadyExists { .. })
        ));
        assert!(matches!(
            create(&mut doc, "bob", "alice", 1, TTL),
            Err(LobbyError::ChallengeAlreadyExists { .. })
        ));
    }

    #[test]
    fn test_busy_target_is_queued() {
        let mut doc = lobby(&["alice", "bob", "carol"]);
        let c = issue(&mut doc, "carol", "bob", 0);
        accept(&mut doc, &c.id, "bob", 1).unwrap();

        let outcome = create(&mut doc, "alice", "bob", 2, TTL).unwrap();
        let ChallengeOutcome::Queued { entry, newly_queued } = outcome.clone() else {
            panic!("expected queued outcome");
        };
        assert!(newly_queued);
        assert!(entry.matches("alice", "bob"));
        assert_eq!(
            outcome.into_challenge(),
            Err(LobbyError::TargetBusy {
                target: "bob".into(),
                newly_queued: true
            })
        );

        let again = create(&mut doc, "alice", "bob", 3, TTL).unwrap();
        assert!(matches!(again, ChallengeOutcome::Queued { newly_queued: false, .. }));
        assert_eq!(doc.waiting_queue.len(), 1);
    }

    #[test]
    fn test_accept_checks() {
        let mut doc = lobby(&["alice", "bob"]);
        let c = issue(&mut doc, "alice", "bob", 0);
        assert_eq!(
            accept(&mut doc, "nope", "bob", 1),
            Err(LobbyError::ChallengeNotFound("nope".into()))
        );
        assert!(matches!(
            accept(&mut doc, &c.id, "alice", 1),
            Err(LobbyError::NotChallenged { .. })
        ));
        assert_eq!(
            accept(&mut doc, &c.id, "bob", TTL + 1),
            Err(LobbyError::ChallengeExpired(c.id.clone()))
        );
        // Exactly at expiry is still acceptable.
        let accepted = accept(&mut doc, &c.id, "bob", TTL).unwrap();
        assert_eq!(accepted.challenge.status, ChallengeStatus::Accepted);
        assert_eq!(
            accepted.challenge.game_session_id.as_deref(),
            Some(accepted.game_session_id.as_str())
        );
        assert!(matches!(
            accept(&mut doc, &c.id, "bob", TTL),
            Err(LobbyError::NotPending {
                status: ChallengeStatus::Accepted,
                ..
            })
        ));
    }

    #[test]
    fn test_accept_refuses_busy_challenger() {
        let mut doc = lobby(&["alice", "bob", "carol"]);
        let to_bob = issue(&mut doc, "alice", "bob", 0);
        let to_carol = issue(&mut doc, "alice", "carol", 0);
        accept(&mut doc, &to_bob.id, "bob", 1).unwrap();
        assert_eq!(
            accept(&mut doc, &to_carol.id, "carol", 2),
            Err(LobbyError::PlayerInSession("alice".into()))
        );
    }

    #[test]
    fn test_reject() {
        let mut doc = lobby(&["alice", "bob"]);
        let c = issue(&mut doc, "alice", "bob", 0);
        assert!(matches!(
            reject(&mut doc, &c.id, "alice"),
            Err(LobbyError::NotChallenged { .. })
        ));
        assert_eq!(reject(&mut doc, &c.id, "bob").unwrap().status, ChallengeStatus::Rejected);
        assert!(matches!(reject(&mut doc, &c.id, "bob"), Err(LobbyError::NotPending { .. })));
        // A settled challenge no longer blocks a new one.
        issue(&mut doc, "bob", "alice", 5);
    }

    #[test]
    fn test_sweep_removes_only_expired_pending() {
        let mut doc = lobby(&["alice", "bob", "carol"]);
        let old = issue(&mut doc, "alice", "bob", 0);
        let fresh = issue(&mut doc, "alice", "carol", 100_000);
        assert_eq!(sweep_expired(&mut doc, TTL + 1), 1);
        assert!(!doc.challenges.contains_key(&old.id));
        assert!(doc.challenges.contains_key(&fresh.id));
        assert_eq!(sweep_expired(&mut doc, TTL + 1), 0);
    }

    #[test]
    fn test_pending_for_hides_expired() {
        let mut doc = lobby(&["alice", "bob", "carol"]);
        issue(&mut doc, "alice", "bob", 0);
        issue(&mut doc, "carol", "bob", 10);
        assert_eq!(pending_for(&doc, "bob", 5).len(), 2);
        assert_eq!(pending_for(&doc, "bob", TTL + 5).len(), 1);
        assert_eq!(outgoing_for(&doc, "alice", 5).len(), 1);
        assert!(pending_for(&doc, "alice", 5).is_empty());
    }
}
