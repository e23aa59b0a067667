//! The shared document and the entities it owns.
//!
//! The [`Document`] is the only persisted unit. Entities refer to each other by
//! username or id string, never by reference, since every read hands out a
//! fresh deserialization.
//!
//! Collections are `BTreeMap`s so serialization and iteration order are
//! deterministic across contexts.

mod challenge;
mod choice;
mod document;
mod game;
mod player;
mod waiting;

pub use challenge::{Challenge, ChallengeStatus};
pub use choice::{Choice, Outcome, RoundOutcome, resolve};
pub use document::{Document, LeaderboardEntry};
pub use game::{GameSession, ReplayRequest, SessionStatus};
pub use player::{Player, PlayerStats};
pub use waiting::WaitingQueueEntry;
