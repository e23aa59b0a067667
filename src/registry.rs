//! Player registration and presence.
//!
//! The username space is global: it lives in the shared document, so a name
//! taken in one context is taken in all of them.

use tracing::{info, warn};

use crate::config::ScoringRules;
use crate::error::{LobbyError, LobbyResult};
use crate::matchmaking;
use crate::score;
use crate::state::{Document, Player};

/// Add a player owned by `instance_id`.
///
/// # Errors
///
/// Returns [`LobbyError::InvalidUsername`] for a blank name and
/// [`LobbyError::DuplicateUsername`] if the name is already registered.
pub fn register(
    doc: &mut Document,
    username: &str,
    instance_id: &str,
    now: u64,
    rules: &ScoringRules,
) -> LobbyResult<Player> {
    let username = username.trim();
    if username.is_empty() {
        return Err(LobbyError::InvalidUsername(username.to_string()));
    }
    if doc.players.contains_key(username) {
        return Err(LobbyError::DuplicateUsername(username.to_string()));
    }

    let player = Player::new(username, instance_id, now);
    doc.players.insert(username.to_string(), player.clone());
    score::refresh(doc, rules);
    info!(player = username, instance = instance_id, "player registered");
    Ok(player)
}

/// Remove a player and every waiting-queue entry on either side of them.
///
/// Returns whether the player was present; removing an absent player is a
/// no-op. An active session the player was in stays active, and its opponent
/// stays busy until they submit or leave.
pub fn unregister(doc: &mut Document, username: &str, rules: &ScoringRules) -> bool {
    if doc.players.remove(username).is_none() {
        return false;
    }
    if let Some(session) = doc.active_session_for(username) {
        warn!(
            player = username,
            session = %session.id,
            opponent = session.opponent_of(username).unwrap_or_default(),
            "player removed mid-game; opponent stranded in active session"
        );
    }
    matchmaking::dequeue_all_for(doc, username);
    score::refresh(doc, rules);
    info!(player = username, "player removed");
    true
}

/// Remove every player owned by `instance_id`, returning their names.
pub fn unregister_instance(doc: &mut Document, instance_id: &str, rules: &ScoringRules) -> Vec<String> {
    let owned: Vec<String> = doc
        .players
        .values()
        .filter(|p| p.instance_id == instance_id)
        .map(|p| p.username.clone())
        .collect();
    for username in &owned {
        unregister(doc, username, rules);
    }
    owned
}

/// Set a player's online flag.
///
/// # Errors
///
/// Returns [`LobbyError::PlayerNotFound`] if the player is not registered.
pub fn set_online(
    doc: &mut Document,
    username: &str,
    online: bool,
    rules: &ScoringRules,
) -> LobbyResult<()> {
    let player = doc
        .players
        .get_mut(username)
        .ok_or_else(|| LobbyError::PlayerNotFound(username.to_string()))?;
    player.is_online = online;
    score::refresh(doc, rules);
    Ok(())
}

/// Players currently online.
#[must_use]
pub fn list_online(doc: &Document) -> Vec<&Player> {
    doc.players.values().filter(|p| p.is_online).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WaitingQueueEntry;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn rules() -> ScoringRules {
        ScoringRules::default()
    }

    #[test]
    fn test_register_and_duplicate() {
        let mut doc = Document::default();
        let alice = register(&mut doc, "alice", "instance_1_a", 5, &rules()).unwrap();
        assert!(alice.is_online);
        assert_eq!(alice.joined_at, 5);
        assert_eq!(doc.leaderboard.len(), 1);
        assert_eq!(
            register(&mut doc, "alice", "instance_2_b", 6, &rules()),
            Err(LobbyError::DuplicateUsername("alice".into()))
        );
    }

    #[test]
    fn test_register_trims_and_rejects_blank() {
        let mut doc = Document::default();
        assert!(matches!(
            register(&mut doc, "   ", "i", 0, &rules()),
            Err(LobbyError::InvalidUsername(_))
        ));
        let bob = register(&mut doc, "  bob ", "i", 0, &rules()).unwrap();
        assert_eq!(bob.username, "bob");
        assert!(doc.players.contains_key("bob"));
    }

    #[test]
    fn test_unregister_is_idempotent_and_clears_queue() {
        let mut doc = Document::default();
        register(&mut doc, "alice", "i", 0, &rules()).unwrap();
        register(&mut doc, "bob", "i", 0, &rules()).unwrap();
        doc.waiting_queue.push(WaitingQueueEntry {
            id: "queue_1_a".into(),
            waiting_player: "alice".into(),
            target_player: "bob".into(),
            created_at: 1,
        });

        assert!(unregister(&mut doc, "alice", &rules()));
        assert!(doc.waiting_queue.is_empty());
        assert_eq!(doc.leaderboard.len(), 1);
        assert!(!unregister(&mut doc, "alice", &rules()));
    }

    #[derive(Clone, Default)]
    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unregister_mid_game_warns_about_opponent() {
        let mut doc = Document::default();
        register(&mut doc, "alice", "i", 0, &rules()).unwrap();
        register(&mut doc, "bob", "i", 0, &rules()).unwrap();
        let id = crate::session::create_session(&mut doc, "alice", "bob", 1);

        let sink = LogSink::default();
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(unregister(&mut doc, "alice", &rules()));
        });

        let logs = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("WARN"));
        assert!(logs.contains("opponent stranded"));
        assert!(logs.contains("opponent=\"bob\""));
        assert!(logs.contains(&id));
        assert!(doc.game_sessions[&id].is_active());
    }

    #[test]
    fn test_unregister_instance_only_touches_owned_players() {
        let mut doc = Document::default();
        register(&mut doc, "alice", "tab-a", 0, &rules()).unwrap();
        register(&mut doc, "bob", "tab-b", 0, &rules()).unwrap();
        let removed = unregister_instance(&mut doc, "tab-a", &rules());
        assert_eq!(removed, ["alice"]);
        assert!(doc.players.contains_key("bob"));
    }

    #[test]
    fn test_list_online_filters() {
        let mut doc = Document::default();
        register(&mut doc, "alice", "i", 0, &rules()).unwrap();
        register(&mut doc, "bob", "i", 0, &rules()).unwrap();
        set_online(&mut doc, "bob", false, &rules()).unwrap();
        let online: Vec<&str> = list_online(&doc).iter().map(|p| p.username.as_str()).collect();
        assert_eq!(online, ["alice"]);
        assert!(set_online(&mut doc, "zed", true, &rules()).is_err());
    }
}
