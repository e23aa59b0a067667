//! `challenge`, `accept`, `reject` and `pending` commands.

use super::output::{
    JsonChallengeOutcome, emit, format_challenge, format_challenges, format_outcome,
};
use super::{CliError, OutputFormat};
use rps_lobby::{FileStore, Lobby};

/// Challenge a player, or queue behind them if they are busy.
///
/// # Errors
///
/// Returns an error if the challenge is refused.
pub(crate) fn issue(
    lobby: &Lobby<FileStore>,
    challenger: &str,
    challenged: &str,
    format: OutputFormat,
) -> Result<(), CliError> {
    let outcome = lobby.create_challenge(challenger, challenged)?;
    emit(format, &JsonChallengeOutcome::from_outcome(&outcome), |o| format_outcome(o))
}

/// Accept a challenge and start the game.
///
/// # Errors
///
/// Returns an error if the challenge cannot be accepted.
pub(crate) fn accept(
    lobby: &Lobby<FileStore>,
    challenge_id: &str,
    user: &str,
    format: OutputFormat,
) -> Result<(), CliError> {
    let accepted = lobby.accept_challenge(challenge_id, user)?;
    emit(format, &accepted.challenge, |c| {
        format!("Game {} started: {}", accepted.game_session_id, format_challenge(c))
    })
}

/// Reject a challenge.
///
/// # Errors
///
/// Returns an error if the challenge cannot be rejected.
pub(crate) fn reject(
    lobby: &Lobby<FileStore>,
    challenge_id: &str,
    user: &str,
    format: OutputFormat,
) -> Result<(), CliError> {
    let challenge = lobby.reject_challenge(challenge_id, user)?;
    emit(format, &challenge, |c| format!("Rejected: {}", format_challenge(c)))
}

/// List open challenges addressed to, or issued by, `user`.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub(crate) fn pending(
    lobby: &Lobby<FileStore>,
    user: &str,
    outgoing: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let challenges = if outgoing {
        lobby.outgoing_challenges_for(user)
    } else {
        lobby.pending_challenges_for(user)
    };
    emit(format, &challenges, |c| format_challenges(c))
}
