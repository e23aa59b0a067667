//! The per-context entry point.
//!
//! A [`Lobby`] is constructed once per execution context and owns that
//! context's store handle, bus attachment, clock and configuration. Every
//! mutating call is one synchronous read-modify-write cycle on the whole
//! document: read, compute, write, then notify the other contexts (and, with
//! `self_notify`, this context's own subscribers). A failed operation writes
//! nothing.
//!
//! Reads always go to the store; nothing is cached between calls.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::bus::{ChangeEvent, ChangeHub, HandlerError, InstanceBus, Subscription};
use crate::clock::{Clock, SystemClock};
use crate::config::LobbyConfig;
use crate::coordinator::{self, AcceptedChallenge, ChallengeOutcome};
use crate::error::LobbyResult;
use crate::ids::{self, IdKind};
use crate::matchmaking;
use crate::registry;
use crate::replay;
use crate::score;
use crate::session;
use crate::state::{
    Challenge, Choice, Document, GameSession, LeaderboardEntry, Player, ReplayRequest,
    WaitingQueueEntry,
};
use crate::store::{KeyValueStore, StateStore};

/// Outcome of [`Lobby::make_choice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceReceipt {
    /// The session after the choice was recorded.
    pub session: GameSession,
    /// Challenges issued from the waiting queue because the session freed
    /// its players.
    pub delivered: Vec<Challenge>,
}

/// What this context knows about its logged-in player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Nobody is logged in here.
    Anonymous,
    /// The player is still registered.
    Active(String),
    /// Another context removed the player; this context has logged out.
    Evicted(String),
}

/// What one [`Lobby::poll`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Expired pending challenges removed.
    pub expired_challenges: usize,
    /// Replay pins cleared because their challenge no longer exists.
    pub cleared_replays: usize,
    /// Completed sessions purged.
    pub purged_sessions: usize,
    /// Whether the document changed since this context last looked.
    pub changed: bool,
}

/// One execution context's handle on the shared lobby.
#[derive(Debug)]
pub struct Lobby<S> {
    store: StateStore<S>,
    bus: InstanceBus,
    clock: Arc<dyn Clock>,
    config: LobbyConfig,
    current_user: Option<String>,
    last_seen: Mutex<Option<String>>,
}

impl<S: KeyValueStore> Lobby<S> {
    /// Attach a new context to `hub`, persisting through `backend`.
    pub fn new(backend: S, hub: &ChangeHub, clock: Arc<dyn Clock>, config: LobbyConfig) -> Self {
        let instance_id = ids::generate(IdKind::Instance, clock.now_ms(), |_| false);
        let store = StateStore::new(backend, config.storage_key.clone());
        let last_seen = store.read_raw();
        Self {
            store,
            bus: hub.attach(instance_id),
            clock,
            config,
            current_user: None,
            last_seen: Mutex::new(last_seen),
        }
    }

    /// A context using the system clock and default configuration.
    pub fn with_defaults(backend: S, hub: &ChangeHub) -> Self {
        Self::with_config(backend, hub, LobbyConfig::default())
    }

    /// A context using the system clock.
    pub fn with_config(backend: S, hub: &ChangeHub, config: LobbyConfig) -> Self {
        Self::new(backend, hub, Arc::new(SystemClock), config)
    }

    /// This context's instance id.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        self.bus.instance_id()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Be told when the document changes.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.bus.subscribe(handler)
    }

    /// A fresh copy of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> Document {
        self.store.read()
    }

    fn mark_seen(&self, raw: Option<String>) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = raw;
    }

    fn announce(&self, event: &ChangeEvent) {
        self.bus.publish(event);
        if self.config.self_notify {
            self.bus.notify_local(event);
        }
    }

    fn mutate<T, F>(&self, f: F) -> LobbyResult<T>
    where
        F: FnOnce(&mut Document, u64) -> LobbyResult<T>,
    {
        let now = self.clock.now_ms();
        let mut doc = self.store.read();
        let value = f(&mut doc, now)?;
        let event = self.store.write(&mut doc, now)?;
        self.mark_seen(event.new_value.clone());
        self.announce(&event);
        Ok(value)
    }

    fn sweep<const N: usize, F>(&self, f: F) -> [usize; N]
    where
        F: FnOnce(&mut Document, u64) -> [usize; N],
    {
        let now = self.clock.now_ms();
        let mut doc = self.store.read();
        let removed = f(&mut doc, now);
        if removed.iter().all(|&n| n == 0) {
            return removed;
        }
        match self.store.write(&mut doc, now) {
            Ok(event) => {
                self.mark_seen(event.new_value.clone());
                self.announce(&event);
                removed
            }
            Err(e) => {
                warn!(error = %e, "sweep could not persist");
                [0; N]
            }
        }
    }

    // === Players ===

    /// Register `username` as owned by this context.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank or taken username.
    pub fn add_player(&self, username: &str) -> LobbyResult<Player> {
        let rules = self.config.scoring;
        let instance = self.instance_id().to_string();
        self.mutate(|doc, now| registry::register(doc, username, &instance, now, &rules))
    }

    /// Remove `username` and its queue entries. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be written.
    pub fn remove_player(&self, username: &str) -> LobbyResult<bool> {
        let rules = self.config.scoring;
        self.mutate(|doc, _| Ok(registry::unregister(doc, username, &rules)))
    }

    /// Mark a player online or offline.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LobbyError::PlayerNotFound`] for an unknown player.
    pub fn set_online(&self, username: &str, online: bool) -> LobbyResult<()> {
        let rules = self.config.scoring;
        self.mutate(|doc, _| registry::set_online(doc, username, online, &rules))
    }

    /// Register `username` and remember it as this context's player.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank or taken username.
    pub fn login(&mut self, username: &str) -> LobbyResult<Player> {
        if self.current_user.is_some() {
            self.logout()?;
        }
        let player = self.add_player(username)?;
        self.current_user = Some(player.username.clone());
        Ok(player)
    }

    /// Unregister this context's player. Returns who was logged out.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be written.
    pub fn logout(&mut self) -> LobbyResult<Option<String>> {
        let Some(username) = self.current_user.take() else {
            return Ok(None);
        };
        self.remove_player(&username)?;
        Ok(Some(username))
    }

    /// The player logged in through this context.
    #[must_use]
    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    /// Check whether this context's player is still registered.
    ///
    /// When another context removed it, the local login is dropped and
    /// [`Presence::Evicted`] is returned once.
    pub fn check_presence(&mut self) -> Presence {
        let Some(username) = self.current_user.clone() else {
            return Presence::Anonymous;
        };
        if self.store.read().players.contains_key(&username) {
            Presence::Active(username)
        } else {
            info!(player = %username, "player removed by another context");
            self.current_user = None;
            Presence::Evicted(username)
        }
    }

    /// Remove every player this context registered, as when the context is
    /// closing. Returns their names.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be written.
    pub fn teardown(&mut self) -> LobbyResult<Vec<String>> {
        let rules = self.config.scoring;
        let instance = self.instance_id().to_string();
        let removed =
            self.mutate(|doc, _| Ok(registry::unregister_instance(doc, &instance, &rules)))?;
        self.current_user = None;
        Ok(removed)
    }

    /// A player by name.
    #[must_use]
    pub fn player(&self, username: &str) -> Option<Player> {
        self.store.read().players.remove(username)
    }

    /// Players currently online.
    #[must_use]
    pub fn online_players(&self) -> Vec<Player> {
        let doc = self.store.read();
        registry::list_online(&doc).into_iter().cloned().collect()
    }

    // === Challenges ===

    /// Challenge `challenged` on behalf of `challenger`.
    ///
    /// A busy target yields [`ChallengeOutcome::Queued`]; use
    /// [`ChallengeOutcome::into_challenge`] to treat that as
    /// [`crate::LobbyError::TargetBusy`].
    ///
    /// # Errors
    ///
    /// See [`coordinator::create`].
    pub fn create_challenge(&self, challenger: &str, challenged: &str) -> LobbyResult<ChallengeOutcome> {
        let ttl = self.config.challenge_ttl_ms;
        self.mutate(|doc, now| coordinator::create(doc, challenger, challenged, now, ttl))
    }

    /// Accept a challenge addressed to `user`.
    ///
    /// # Errors
    ///
    /// See [`coordinator::accept`].
    pub fn accept_challenge(&self, challenge_id: &str, user: &str) -> LobbyResult<AcceptedChallenge> {
        self.mutate(|doc, now| coordinator::accept(doc, challenge_id, user, now))
    }

    /// Decline a challenge addressed to `user`.
    ///
    /// # Errors
    ///
    /// See [`coordinator::reject`].
    pub fn reject_challenge(&self, challenge_id: &str, user: &str) -> LobbyResult<Challenge> {
        self.mutate(|doc, _| coordinator::reject(doc, challenge_id, user))
    }

    /// Open challenges addressed to `user`, oldest first.
    #[must_use]
    pub fn pending_challenges_for(&self, user: &str) -> Vec<Challenge> {
        let doc = self.store.read();
        coordinator::pending_for(&doc, user, self.clock.now_ms())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Open challenges issued by `user`, oldest first.
    #[must_use]
    pub fn outgoing_challenges_for(&self, user: &str) -> Vec<Challenge> {
        let doc = self.store.read();
        coordinator::outgoing_for(&doc, user, self.clock.now_ms())
            .into_iter()
            .cloned()
            .collect()
    }

    // === Sessions ===

    /// Submit `user`'s choice. When it completes the session, each freed
    /// player is offered to the oldest entry waiting on them.
    ///
    /// # Errors
    ///
    /// See [`session::submit_choice`].
    pub fn make_choice(&self, session_id: &str, user: &str, choice: Choice) -> LobbyResult<ChoiceReceipt> {
        let rules = self.config.scoring;
        let ttl = self.config.challenge_ttl_ms;
        self.mutate(|doc, now| {
            let session = session::submit_choice(doc, session_id, user, choice, now, &rules)?;
            let mut delivered = Vec::new();
            if !session.is_active() {
                for player in &session.players {
                    if let Some(challenge) = matchmaking::try_deliver_for(doc, player, now, ttl) {
                        delivered.push(challenge);
                    }
                }
            }
            Ok(ChoiceReceipt { session, delivered })
        })
    }

    /// The active session `user` plays in.
    #[must_use]
    pub fn active_session_for(&self, user: &str) -> Option<GameSession> {
        self.store.read().active_session_for(user).cloned()
    }

    /// Whether `user` is in an active session.
    #[must_use]
    pub fn is_player_in_active_game(&self, user: &str) -> bool {
        self.store.read().is_in_active_session(user)
    }

    /// A session by id, active or completed.
    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<GameSession> {
        self.store.read().game_sessions.remove(session_id)
    }

    // === Replays ===

    /// Ask the opponent of a finished session for a rematch.
    ///
    /// # Errors
    ///
    /// See [`replay::request`].
    pub fn request_replay(&self, session_id: &str, user: &str) -> LobbyResult<ChallengeOutcome> {
        let ttl = self.config.challenge_ttl_ms;
        self.mutate(|doc, now| replay::request(doc, session_id, user, now, ttl))
    }

    /// Accept a rematch addressed to `user`.
    ///
    /// # Errors
    ///
    /// See [`replay::accept`].
    pub fn accept_replay(&self, session_id: &str, user: &str) -> LobbyResult<AcceptedChallenge> {
        self.mutate(|doc, now| replay::accept(doc, session_id, user, now))
    }

    /// Decline or withdraw a rematch request.
    ///
    /// # Errors
    ///
    /// See [`replay::decline`].
    pub fn decline_replay(&self, session_id: &str, user: &str) -> LobbyResult<()> {
        self.mutate(|doc, _| replay::decline(doc, session_id, user))
    }

    /// The live rematch request on a session.
    #[must_use]
    pub fn replay_request_for(&self, session_id: &str) -> Option<ReplayRequest> {
        let doc = self.store.read();
        replay::request_for(&doc, session_id).cloned()
    }

    // === Derived views ===

    /// Ranked leaderboard, recomputed from player statistics.
    #[must_use]
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let doc = self.store.read();
        score::rank(doc.players.values(), &self.config.scoring)
    }

    /// The waiting queue in insertion order.
    #[must_use]
    pub fn waiting_queue(&self) -> Vec<WaitingQueueEntry> {
        self.store.read().waiting_queue
    }

    // === Hygiene ===

    fn expire(&self) -> [usize; 2] {
        self.sweep(|doc, now| [coordinator::sweep_expired(doc, now), replay::prune_stale(doc)])
    }

    /// Remove expired pending challenges and the replay pins left pointing
    /// at them. Returns the number of challenges removed.
    ///
    /// Never fails; writes only when something was removed.
    pub fn cleanup_expired_challenges(&self) -> usize {
        let [challenges, _] = self.expire();
        challenges
    }

    /// Purge sessions completed longer ago than the retention window.
    ///
    /// Never fails; writes only when something was removed.
    pub fn cleanup_completed_sessions(&self) -> usize {
        let retention = self.config.session_retention_ms;
        let [purged] = self.sweep(|doc, now| [session::sweep_completed(doc, now, retention)]);
        purged
    }

    /// Run both sweeps, counting each kind of removal separately.
    pub fn cleanup(&self) -> PollReport {
        let [expired_challenges, cleared_replays] = self.expire();
        PollReport {
            expired_challenges,
            cleared_replays,
            purged_sessions: self.cleanup_completed_sessions(),
            changed: false,
        }
    }

    /// Re-read the document and, if another context changed it since this
    /// one last looked, notify local subscribers. Returns whether it changed.
    ///
    /// Changes are detected on the stored text, so two writes stamped with
    /// the same millisecond are still told apart.
    pub fn reconcile(&self) -> bool {
        let raw = self.store.read_raw();
        let changed = {
            let mut seen = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
            let changed = *seen != raw;
            if changed {
                seen.clone_from(&raw);
            }
            changed
        };
        if changed {
            self.bus.notify_local(&ChangeEvent {
                key: self.store.key().to_string(),
                new_value: raw,
                old_value: None,
            });
        }
        changed
    }

    /// One polling pass: [`Lobby::cleanup`], then [`Lobby::reconcile`].
    pub fn poll(&self) -> PollReport {
        let mut report = self.cleanup();
        report.changed = self.reconcile();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn lobby() -> (Lobby<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(1_000);
        let hub = ChangeHub::new();
        let lobby = Lobby::new(
            MemoryStore::new(),
            &hub,
            Arc::new(clock.clone()),
            LobbyConfig::default(),
        );
        (lobby, clock)
    }

    #[test]
    fn test_instance_id_prefix() {
        let (lobby, _) = lobby();
        assert!(lobby.instance_id().starts_with("instance_1000_"));
    }

    #[test]
    fn test_with_defaults() {
        let hub = ChangeHub::new();
        let lobby = Lobby::with_defaults(MemoryStore::new(), &hub);
        assert_eq!(lobby.config(), &LobbyConfig::default());
        assert_eq!(hub.attached(), 1);
        let player = lobby.add_player("alice").unwrap();
        assert!(player.joined_at > 0);
    }

    #[test]
    fn test_failed_operation_writes_nothing() {
        let (lobby, _) = lobby();
        lobby.add_player("alice").unwrap();
        let before = lobby.snapshot();
        assert!(lobby.add_player("alice").is_err());
        assert_eq!(lobby.snapshot(), before);
    }

    #[test]
    fn test_login_logout() {
        let (mut lobby, _) = lobby();
        let player = lobby.login("alice").unwrap();
        assert_eq!(player.instance_id, lobby.instance_id());
        assert_eq!(lobby.current_user(), Some("alice"));
        assert_eq!(lobby.logout().unwrap().as_deref(), Some("alice"));
        assert!(lobby.player("alice").is_none());
        assert_eq!(lobby.logout().unwrap(), None);
    }

    #[test]
    fn test_sweeps_only_write_on_change() {
        let (lobby, clock) = lobby();
        lobby.add_player("alice").unwrap();
        lobby.add_player("bob").unwrap();
        lobby.create_challenge("alice", "bob").unwrap();
        let stamp = lobby.snapshot().last_updated;

        clock.advance(1);
        assert_eq!(lobby.cleanup_expired_challenges(), 0);
        assert_eq!(lobby.snapshot().last_updated, stamp);

        clock.advance(lobby.config().challenge_ttl_ms);
        assert_eq!(lobby.cleanup_expired_challenges(), 1);
        assert!(lobby.snapshot().challenges.is_empty());
    }

    #[test]
    fn test_poll_reports_foreign_changes_once() {
        let (lobby, _) = lobby();
        assert!(!lobby.poll().changed);
        lobby.add_player("alice").unwrap();
        // Own writes are already seen.
        assert!(!lobby.poll().changed);

        let mut doc = lobby.snapshot();
        doc.players.clear();
        let store = StateStore::new(lobby.store.backend().clone(), lobby.store.key());
        store.write(&mut doc, 99_999).unwrap();
        assert!(lobby.poll().changed);
        assert!(!lobby.poll().changed);
    }
}
