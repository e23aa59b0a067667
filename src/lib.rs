// Allow unwrap in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! rps-lobby: a multi-context rock-paper-scissors lobby over one shared document.
//!
//! Every execution context (a tab, a process, a thread) holds a [`Lobby`]
//! over the same key/value backend. All lobby state lives in a single JSON
//! [`Document`] that is read, modified and written back whole on each
//! operation; the last writer wins. Contexts learn about each other's writes
//! through a [`ChangeHub`] and by polling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 Lobby (facade)                  │
//! │      read ─▶ compute ─▶ write ─▶ broadcast      │
//! ├──────────┬─────────────┬──────────┬─────────────┤
//! │ registry │ coordinator │ session  │ matchmaking │
//! │          │   replay    │  score   │             │
//! ├──────────┴─────────────┴──────────┴─────────────┤
//! │        StateStore ─▶ KeyValueStore backend      │
//! │            (MemoryStore / FileStore)            │
//! ├─────────────────────────────────────────────────┤
//! │          ChangeHub ─▶ InstanceBus (each)        │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The engine modules are free functions over `&mut Document`; they never do
//! I/O. [`Lobby`] owns the cycle around them.

pub mod bus;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ids;
pub mod invariants;
pub mod lobby;
pub mod matchmaking;
pub mod registry;
pub mod replay;
pub mod score;
pub mod session;
pub mod state;
pub mod store;

pub use bus::{ChangeEvent, ChangeHub, InstanceBus, Subscription};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LobbyConfig, ScoringRules};
pub use coordinator::{AcceptedChallenge, ChallengeOutcome};
pub use error::{ErrorKind, LobbyError, LobbyResult};
pub use lobby::{ChoiceReceipt, Lobby, PollReport, Presence};
pub use state::{
    Challenge, ChallengeStatus, Choice, Document, GameSession, LeaderboardEntry, Outcome, Player,
    PlayerStats, ReplayRequest, SessionStatus, WaitingQueueEntry,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, StateStore, StoreError};
