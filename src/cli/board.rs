//! `leaderboard`, `queue` and `sweep` commands.

use super::output::{JsonPoll, emit, format_leaderboard, format_poll, format_queue};
use super::{CliError, OutputFormat};
use rps_lobby::{FileStore, Lobby};

/// Show the leaderboard.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub(crate) fn leaderboard(lobby: &Lobby<FileStore>, top: Option<usize>, format: OutputFormat) -> Result<(), CliError> {
    let mut entries = lobby.leaderboard();
    if let Some(top) = top {
        entries.truncate(top);
    }
    emit(format, &entries, |e| format_leaderboard(e))
}

/// Show the waiting queue.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub(crate) fn queue(lobby: &Lobby<FileStore>, format: OutputFormat) -> Result<(), CliError> {
    let entries = lobby.waiting_queue();
    emit(format, &entries, |e| format_queue(e))
}

/// Run both sweeps once.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub(crate) fn sweep(lobby: &Lobby<FileStore>, format: OutputFormat) -> Result<(), CliError> {
    emit(format, &JsonPoll::from(lobby.cleanup()), |p| {
        let text = format_poll(p);
        if text.is_empty() { "Nothing to sweep\n".to_string() } else { text }
    })
}
