//! `choose` and `session` commands.

use super::output::{JsonChoice, emit, format_choice, format_session};
use super::{CliError, OutputFormat};
use rps_lobby::{Choice, FileStore, Lobby};

/// Submit a choice.
///
/// # Errors
///
/// Returns an error if the choice is refused.
pub(crate) fn choose(
    lobby: &Lobby<FileStore>,
    session_id: &str,
    user: &str,
    choice: Choice,
    format: OutputFormat,
) -> Result<(), CliError> {
    let receipt = lobby.make_choice(session_id, user, choice)?;
    emit(format, &JsonChoice::from_receipt(&receipt), |c| format_choice(c))
}

/// Show a session by id, or a player's active session.
///
/// # Errors
///
/// Returns an error if no matching session exists.
pub(crate) fn show(
    lobby: &Lobby<FileStore>,
    session_id: Option<&str>,
    player: Option<&str>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let session = match (session_id, player) {
        (Some(id), _) => lobby
            .session(id)
            .ok_or_else(|| CliError::new(format!("No session {id}")))?,
        (None, Some(name)) => lobby
            .active_session_for(name)
            .ok_or_else(|| CliError::new(format!("{name} is not in a game")))?,
        (None, None) => return Err(CliError::new("Give a session id or --player")),
    };
    emit(format, &session, |s| format_session(s))
}
