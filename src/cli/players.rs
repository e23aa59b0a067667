//! `join`, `leave` and `players` commands.

use super::output::{emit, format_player, format_players};
use super::{CliError, OutputFormat};
use rps_lobby::{FileStore, Lobby};
use serde_json::json;

/// Register a player.
///
/// # Errors
///
/// Returns an error if the username is blank or taken.
pub(crate) fn join(lobby: &Lobby<FileStore>, username: &str, format: OutputFormat) -> Result<(), CliError> {
    let player = lobby.add_player(username)?;
    emit(format, &player, |p| format!("Joined: {}", format_player(p)))
}

/// Remove a player.
///
/// # Errors
///
/// Returns an error if the document cannot be written.
pub(crate) fn leave(lobby: &Lobby<FileStore>, username: &str, format: OutputFormat) -> Result<(), CliError> {
    let removed = lobby.remove_player(username)?;
    let value = json!({ "username": username, "removed": removed });
    emit(format, &value, |_| {
        if removed {
            format!("{username} left the lobby\n")
        } else {
            format!("{username} was not in the lobby\n")
        }
    })
}

/// List online players.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub(crate) fn list(lobby: &Lobby<FileStore>, format: OutputFormat) -> Result<(), CliError> {
    let players = lobby.online_players();
    emit(format, &players, |p| format_players(p))
}
