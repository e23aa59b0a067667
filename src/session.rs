//! Session state machine: `active -> completed`.
//!
//! Each player's choice is write-once. The second distinct choice resolves the
//! round, so exactly one resolution happens per session and any later
//! submission finds the session completed.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::ScoringRules;
use crate::error::{LobbyError, LobbyResult};
use crate::ids::{self, IdKind};
use crate::score;
use crate::state::{Choice, Document, GameSession, Outcome, SessionStatus, resolve};

/// Start an active session between two players. Returns its id.
pub fn create_session(doc: &mut Document, first: &str, second: &str, now: u64) -> String {
    let id = ids::generate(IdKind::Game, now, |id| doc.id_taken(id));
    doc.game_sessions
        .insert(id.clone(), GameSession::new(id.clone(), first, second, now));
    info!(session = %id, first, second, "session started");
    id
}

/// Record `username`'s choice; resolve the round if it is the second one.
///
/// Returns the session after the update. When it comes back `completed`, both
/// players' statistics and the leaderboard have already been updated.
///
/// # Errors
///
/// Returns [`LobbyError::SessionNotFound`], [`LobbyError::PlayerNotInSession`],
/// [`LobbyError::SessionNotActive`] or [`LobbyError::ChoiceAlreadyMade`].
pub fn submit_choice(
    doc: &mut Document,
    session_id: &str,
    username: &str,
    choice: Choice,
    now: u64,
    rules: &ScoringRules,
) -> LobbyResult<GameSession> {
    let session = doc
        .game_sessions
        .get_mut(session_id)
        .ok_or_else(|| LobbyError::SessionNotFound(session_id.to_string()))?;
    if !session.has_player(username) {
        return Err(LobbyError::PlayerNotInSession {
            session_id: session_id.to_string(),
            user: username.to_string(),
        });
    }
    if session.status != SessionStatus::Active {
        return Err(LobbyError::SessionNotActive(session_id.to_string()));
    }
    if session.choices.contains_key(username) {
        return Err(LobbyError::ChoiceAlreadyMade {
            session_id: session_id.to_string(),
            user: username.to_string(),
        });
    }

    session.choices.insert(username.to_string(), choice);
    debug!(session = session_id, player = username, "choice recorded");

    let [first, second] = session.players.clone();
    let (Some(&first_choice), Some(&second_choice)) =
        (session.choices.get(&first), session.choices.get(&second))
    else {
        return Ok(session.clone());
    };

    let (first_outcome, second_outcome) = resolve(first_choice, second_choice).outcomes();
    session.result = Some(BTreeMap::from([
        (first.clone(), first_outcome),
        (second.clone(), second_outcome),
    ]));
    session.winner = match (first_outcome, second_outcome) {
        (Outcome::Win, _) => Some(first.clone()),
        (_, Outcome::Win) => Some(second.clone()),
        _ => None,
    };
    session.status = SessionStatus::Completed;
    session.completed_at = Some(now);
    let resolved = session.clone();
    info!(
        session = session_id,
        winner = resolved.winner.as_deref().unwrap_or("draw"),
        "session resolved"
    );

    for (name, outcome) in [(&first, first_outcome), (&second, second_outcome)] {
        if let Some(player) = doc.players.get_mut(name.as_str()) {
            player.stats.record(outcome);
        }
    }
    score::refresh(doc, rules);
    Ok(resolved)
}

/// Remove sessions completed more than `retention_ms` ago. Active sessions
/// are always kept. Returns how many were removed.
pub fn sweep_completed(doc: &mut Document, now: u64, retention_ms: u64) -> usize {
    let before = doc.game_sessions.len();
    doc.game_sessions.retain(|_, s| match (s.status, s.completed_at) {
        (SessionStatus::Completed, Some(done)) => now.saturating_sub(done) <= retention_ms,
        (SessionStatus::Completed, None) => false,
        (SessionStatus::Active, _) => true,
    });
    let removed = before - doc.game_sessions.len();
    if removed > 0 {
        debug!(removed, "completed sessions swept");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    fn setup() -> (Document, String) {
        let mut doc = Document::default();
        let rules = ScoringRules::default();
        registry::register(&mut doc, "alice", "i", 0, &rules).unwrap();
        registry::register(&mut doc, "bob", "i", 0, &rules).unwrap();
        let id = create_session(&mut doc, "alice", "bob", 10);
        (doc, id)
    }

    fn choose(doc: &mut Document, id: &str, who: &str, c: Choice) -> LobbyResult<GameSession> {
        submit_choice(doc, id, who, c, 20, &ScoringRules::default())
    }

    #[test]
    fn test_first_choice_keeps_session_active() {
        let (mut doc, id) = setup();
        let session = choose(&mut doc, &id, "alice", Choice::Rock).unwrap();
        assert!(session.is_active());
        assert!(session.result.is_none());
        assert_eq!(session.choices.len(), 1);
    }

    #[test]
    fn test_choice_is_write_once() {
        let (mut doc, id) = setup();
        choose(&mut doc, &id, "alice", Choice::Rock).unwrap();
        for c in Choice::ALL {
            assert!(matches!(
                choose(&mut doc, &id, "alice", c),
                Err(LobbyError::ChoiceAlreadyMade { .. })
            ));
        }
        assert_eq!(doc.game_sessions[&id].choices["alice"], Choice::Rock);
    }

    #[test]
    fn test_second_choice_resolves() {
        let (mut doc, id) = setup();
        choose(&mut doc, &id, "alice", Choice::Rock).unwrap();
        let done = choose(&mut doc, &id, "bob", Choice::Scissors).unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.winner.as_deref(), Some("alice"));
        assert_eq!(done.completed_at, Some(20));
        let result = done.result.unwrap();
        assert_eq!(result["alice"], Outcome::Win);
        assert_eq!(result["bob"], Outcome::Lose);

        let alice = &doc.players["alice"].stats;
        assert_eq!((alice.wins, alice.win_streak, alice.games_played), (1, 1, 1));
        let bob = &doc.players["bob"].stats;
        assert_eq!((bob.losses, bob.win_streak), (1, 0));
        assert_eq!(doc.leaderboard[0].username, "alice");

        assert_eq!(
            choose(&mut doc, &id, "alice", Choice::Paper),
            Err(LobbyError::SessionNotActive(id.clone()))
        );
    }

    #[test]
    fn test_draw_has_no_winner() {
        let (mut doc, id) = setup();
        choose(&mut doc, &id, "bob", Choice::Paper).unwrap();
        let done = choose(&mut doc, &id, "alice", Choice::Paper).unwrap();
        assert_eq!(done.winner, None);
        assert_eq!(done.result.unwrap()["bob"], Outcome::Draw);
        assert_eq!(doc.players["alice"].stats.draws, 1);
    }

    #[test]
    fn test_errors() {
        let (mut doc, id) = setup();
        assert_eq!(
            choose(&mut doc, "game_missing", "alice", Choice::Rock),
            Err(LobbyError::SessionNotFound("game_missing".into()))
        );
        assert!(matches!(
            choose(&mut doc, &id, "carol", Choice::Rock),
            Err(LobbyError::PlayerNotInSession { .. })
        ));
    }

    #[test]
    fn test_sweep_keeps_active_and_recent() {
        let (mut doc, active) = setup();
        let old = create_session(&mut doc, "x", "y", 0);
        let recent = create_session(&mut doc, "p", "q", 0);
        for (id, done) in [(&old, 1_000), (&recent, 9_000)] {
            let s = doc.game_sessions.get_mut(id).unwrap();
            s.status = SessionStatus::Completed;
            s.completed_at = Some(done);
        }
        assert_eq!(sweep_completed(&mut doc, 10_000, 5_000), 1);
        assert!(doc.game_sessions.contains_key(&active));
        assert!(doc.game_sessions.contains_key(&recent));
        assert!(!doc.game_sessions.contains_key(&old));
        assert_eq!(sweep_completed(&mut doc, 10_000, 5_000), 0);
    }
}
