//! Rematch requests on finished sessions.
//!
//! A replay request is an ordinary challenge whose id is pinned on the
//! completed session so both players can find it from the result screen.
//! The pin is cleared when the opponent answers or when the challenge
//! disappears or settles on its own.

use tracing::info;

use crate::coordinator::{self, AcceptedChallenge, ChallengeOutcome};
use crate::error::{LobbyError, LobbyResult};
use crate::state::{ChallengeStatus, Document, GameSession, ReplayRequest};

fn finished_session<'a>(doc: &'a Document, session_id: &str, user: &str) -> LobbyResult<&'a GameSession> {
    let session = doc
        .game_sessions
        .get(session_id)
        .ok_or_else(|| LobbyError::SessionNotFound(session_id.to_string()))?;
    if !session.has_player(user) {
        return Err(LobbyError::PlayerNotInSession {
            session_id: session_id.to_string(),
            user: user.to_string(),
        });
    }
    if session.is_active() {
        return Err(LobbyError::SessionStillActive(session_id.to_string()));
    }
    Ok(session)
}

fn clear_request(doc: &mut Document, session_id: &str) {
    if let Some(session) = doc.game_sessions.get_mut(session_id) {
        session.replay_request = None;
    }
}

/// Challenge the opponent of a finished session to a rematch.
///
/// The request is pinned on the session only when a challenge was actually
/// issued; a busy opponent yields a queued outcome like any other challenge.
///
/// # Errors
///
/// Returns [`LobbyError::SessionNotFound`], [`LobbyError::PlayerNotInSession`],
/// [`LobbyError::SessionStillActive`] or any error of
/// [`coordinator::create`].
pub fn request(
    doc: &mut Document,
    session_id: &str,
    user: &str,
    now: u64,
    ttl_ms: u64,
) -> LobbyResult<ChallengeOutcome> {
    let session = finished_session(doc, session_id, user)?;
    let opponent = session
        .opponent_of(user)
        .map(str::to_string)
        .ok_or_else(|| LobbyError::PlayerNotInSession {
            session_id: session_id.to_string(),
            user: user.to_string(),
        })?;

    let outcome = coordinator::create(doc, user, &opponent, now, ttl_ms)?;
    if let ChallengeOutcome::Issued(challenge) = &outcome {
        if let Some(session) = doc.game_sessions.get_mut(session_id) {
            session.replay_request = Some(ReplayRequest {
                challenge_id: challenge.id.clone(),
                from: user.to_string(),
                to: opponent.clone(),
                requested_at: now,
            });
        }
        info!(session = session_id, from = user, to = %opponent, "replay requested");
    }
    Ok(outcome)
}

/// The live replay request on a session, ignoring stale pins.
#[must_use]
pub fn request_for<'a>(doc: &'a Document, session_id: &str) -> Option<&'a ReplayRequest> {
    let pinned = doc.game_sessions.get(session_id)?.replay_request.as_ref()?;
    doc.challenges
        .get(&pinned.challenge_id)
        .filter(|c| c.status == ChallengeStatus::Pending)
        .map(|_| pinned)
}

fn live_request(doc: &Document, session_id: &str, user: &str) -> LobbyResult<ReplayRequest> {
    let session = finished_session(doc, session_id, user)?;
    session
        .replay_request
        .clone()
        .ok_or_else(|| LobbyError::NoReplayRequest(session_id.to_string()))
}

/// Accept the rematch addressed to `user`. Returns the new session.
///
/// # Errors
///
/// Returns [`LobbyError::NoReplayRequest`], [`LobbyError::NotReplayTarget`]
/// or any error of [`coordinator::accept`].
pub fn accept(doc: &mut Document, session_id: &str, user: &str, now: u64) -> LobbyResult<AcceptedChallenge> {
    let pinned = live_request(doc, session_id, user)?;
    if pinned.to != user {
        return Err(LobbyError::NotReplayTarget {
            session_id: session_id.to_string(),
            user: user.to_string(),
        });
    }
    let accepted = coordinator::accept(doc, &pinned.challenge_id, user, now)?;
    clear_request(doc, session_id);
    info!(session = session_id, next = %accepted.game_session_id, "replay accepted");
    Ok(accepted)
}

/// Drop the rematch request on a session.
///
/// The addressee rejects the challenge; the requester withdraws it, which
/// removes the still-pending challenge.
///
/// # Errors
///
/// Returns [`LobbyError::SessionNotFound`], [`LobbyError::PlayerNotInSession`],
/// [`LobbyError::SessionStillActive`] or [`LobbyError::NoReplayRequest`].
pub fn decline(doc: &mut Document, session_id: &str, user: &str) -> LobbyResult<()> {
    let pinned = live_request(doc, session_id, user)?;
    let still_pending = doc
        .challenges
        .get(&pinned.challenge_id)
        .is_some_and(|c| c.status == ChallengeStatus::Pending);
    if still_pending {
        if pinned.to == user {
            coordinator::reject(doc, &pinned.challenge_id, user)?;
        } else {
            doc.challenges.remove(&pinned.challenge_id);
        }
    }
    clear_request(doc, session_id);
    info!(session = session_id, by = user, "replay declined");
    Ok(())
}

/// Clear pins whose challenge is gone or no longer pending. Returns how many.
pub fn prune_stale(doc: &mut Document) -> usize {
    let stale: Vec<String> = doc
        .game_sessions
        .values()
        .filter(|s| s.replay_request.is_some())
        .filter(|s| request_for(doc, &s.id).is_none())
        .map(|s| s.id.clone())
        .collect();
    for id in &stale {
        clear_request(doc, id);
    }
    stale.len()
}
