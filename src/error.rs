//! Error types for lobby operations.

use std::fmt;

use crate::state::ChallengeStatus;

/// Coarse classification of a [`LobbyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input (bad username, bad choice value).
    Validation,
    /// The addressed player, challenge or session does not exist.
    NotFound,
    /// The acting user is not the party the entity is addressed to.
    Authorization,
    /// The operation is invalid for the entity's current status.
    StateConflict,
    /// A time-to-live has passed.
    Expiry,
    /// The durable backend failed to persist the document.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not found",
            ErrorKind::Authorization => "authorization",
            ErrorKind::StateConflict => "state conflict",
            ErrorKind::Expiry => "expiry",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// Errors raised synchronously by lobby operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    /// Username is empty or whitespace.
    InvalidUsername(String),
    /// Username is already registered by some context.
    DuplicateUsername(String),
    /// Choice value is not one of rock, paper, scissors.
    InvalidChoice(String),
    /// A player tried to challenge themselves.
    SelfChallenge(String),
    /// Player is not registered.
    PlayerNotFound(String),
    /// Player is registered but marked offline.
    PlayerOffline(String),
    /// Target is in an active session; a waiting-queue entry was recorded.
    TargetBusy {
        /// The busy player.
        target: String,
        /// False when an identical entry was already queued.
        newly_queued: bool,
    },
    /// A pending challenge already exists between the two players.
    ChallengeAlreadyExists {
        /// Player issuing the new challenge.
        challenger: String,
        /// Player addressed by the new challenge.
        challenged: String,
    },
    /// No challenge with this id.
    ChallengeNotFound(String),
    /// Acting user is not the challenged player.
    NotChallenged {
        /// Challenge id.
        challenge_id: String,
        /// The acting user.
        user: String,
    },
    /// Challenge has already been settled.
    NotPending {
        /// Challenge id.
        challenge_id: String,
        /// Status found in the document.
        status: ChallengeStatus,
    },
    /// Challenge is past its expiry time.
    ChallengeExpired(String),
    /// Player already takes part in an active session.
    PlayerInSession(String),
    /// No session with this id.
    SessionNotFound(String),
    /// Acting user is not one of the session's players.
    PlayerNotInSession {
        /// Session id.
        session_id: String,
        /// The acting user.
        user: String,
    },
    /// Session has already completed.
    SessionNotActive(String),
    /// Session has not completed yet.
    SessionStillActive(String),
    /// Player already submitted a choice in this session.
    ChoiceAlreadyMade {
        /// Session id.
        session_id: String,
        /// The acting user.
        user: String,
    },
    /// Session carries no replay request.
    NoReplayRequest(String),
    /// Acting user is not the addressee of the replay request.
    NotReplayTarget {
        /// Session id.
        session_id: String,
        /// The acting user.
        user: String,
    },
    /// The backing store failed.
    Storage(String),
}

impl LobbyError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            LobbyError::InvalidUsername(_)
            | LobbyError::DuplicateUsername(_)
            | LobbyError::InvalidChoice(_)
            | LobbyError::SelfChallenge(_) => ErrorKind::Validation,
            LobbyError::PlayerNotFound(_)
            | LobbyError::ChallengeNotFound(_)
            | LobbyError::SessionNotFound(_)
            | LobbyError::NoReplayRequest(_) => ErrorKind::NotFound,
            LobbyError::NotChallenged { .. } | LobbyError::NotReplayTarget { .. } => {
                ErrorKind::Authorization
            }
            LobbyError::PlayerOffline(_)
            | LobbyError::TargetBusy { .. }
            | LobbyError::ChallengeAlreadyExists { .. }
            | LobbyError::NotPending { .. }
            | LobbyError::PlayerInSession(_)
            | LobbyError::PlayerNotInSession { .. }
            | LobbyError::SessionNotActive(_)
            | LobbyError::SessionStillActive(_)
            | LobbyError::ChoiceAlreadyMade { .. } => ErrorKind::StateConflict,
            LobbyError::ChallengeExpired(_) => ErrorKind::Expiry,
            LobbyError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl fmt::Display for LobbyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyError::InvalidUsername(name) => write!(f, "invalid username: {name:?}"),
            LobbyError::DuplicateUsername(name) => write!(f, "username already taken: {name}"),
            LobbyError::InvalidChoice(value) => write!(f, "invalid choice: {value:?}"),
            LobbyError::SelfChallenge(name) => write!(f, "{name} cannot challenge themselves"),
            LobbyError::PlayerNotFound(name) => write!(f, "player not found: {name}"),
            LobbyError::PlayerOffline(name) => write!(f, "player is offline: {name}"),
            LobbyError::TargetBusy {
                target,
                newly_queued,
            } => {
                if *newly_queued {
                    write!(f, "{target} is in a game; you have been added to their queue")
                } else {
                    write!(f, "{target} is in a game; you are already in their queue")
                }
            }
            LobbyError::ChallengeAlreadyExists {
                challenger,
                challenged,
            } => write!(
                f,
                "a challenge between {challenger} and {challenged} is already pending"
            ),
            LobbyError::ChallengeNotFound(id) => write!(f, "challenge not found: {id}"),
            LobbyError::NotChallenged { challenge_id, user } => write!(
                f,
                "{user} is not the challenged player of {challenge_id}"
            ),
            LobbyError::NotPending {
                challenge_id,
                status,
            } => write!(f, "challenge {challenge_id} is no longer pending ({status})"),
            LobbyError::ChallengeExpired(id) => write!(f, "challenge has expired: {id}"),
            LobbyError::PlayerInSession(name) => write!(f, "{name} is already in a game"),
            LobbyError::SessionNotFound(id) => write!(f, "game session not found: {id}"),
            LobbyError::PlayerNotInSession { session_id, user } => {
                write!(f, "{user} is not a player of session {session_id}")
            }
            LobbyError::SessionNotActive(id) => write!(f, "game session is not active: {id}"),
            LobbyError::SessionStillActive(id) => write!(f, "game session is still active: {id}"),
            LobbyError::ChoiceAlreadyMade { session_id, user } => {
                write!(f, "{user} has already made a choice in session {session_id}")
            }
            LobbyError::NoReplayRequest(id) => write!(f, "no replay request on session {id}"),
            LobbyError::NotReplayTarget { session_id, user } => {
                write!(f, "{user} is not addressed by the replay request on {session_id}")
            }
            LobbyError::Storage(reason) => write!(f, "storage error: {reason}"),
        }
    }
}

impl std::error::Error for LobbyError {}

/// Result type for lobby operations.
pub type LobbyResult<T> = Result<T, LobbyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(
            LobbyError::DuplicateUsername("a".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LobbyError::SessionNotFound("g".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LobbyError::NotChallenged {
                challenge_id: "c".into(),
                user: "u".into()
            }
            .kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            LobbyError::ChoiceAlreadyMade {
                session_id: "g".into(),
                user: "u".into()
            }
            .kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            LobbyError::ChallengeExpired("c".into()).kind(),
            ErrorKind::Expiry
        );
    }

    #[test]
    fn test_target_busy_message_mentions_queue() {
        let err = LobbyError::TargetBusy {
            target: "bob".into(),
            newly_queued: true,
        };
        assert!(err.to_string().contains("queue"));
        assert!(err.to_string().contains("bob"));
    }
}
