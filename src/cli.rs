//! CLI command implementations for rps-lobby.

pub(crate) mod board;
pub(crate) mod challenge;
pub(crate) mod play;
pub(crate) mod players;
pub(crate) mod watch;

mod output;

use clap::ValueEnum;
use rps_lobby::{ChangeHub, FileStore, Lobby, LobbyConfig, LobbyError};
use std::error::Error;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Output format shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<LobbyError> for CliError {
    fn from(e: LobbyError) -> Self {
        Self::new(format!("{e} ({})", e.kind()))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}

/// Open this invocation's context over the document in `state_dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the config file
/// cannot be read.
pub(crate) fn open(state_dir: &Path, config: Option<&Path>) -> Result<Lobby<FileStore>, CliError> {
    let config = match config {
        Some(path) => LobbyConfig::load(path)
            .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?,
        None => LobbyConfig::from_env(),
    };
    let store = FileStore::open(state_dir).map_err(|e| {
        CliError::new(format!("Failed to open state dir {}: {e}", state_dir.display()))
    })?;
    debug!(dir = %store.dir().display(), key = %config.storage_key, "opened lobby");
    // A one-shot process has no peers to notify in-process.
    let hub = ChangeHub::new();
    Ok(Lobby::with_config(store, &hub, config))
}
