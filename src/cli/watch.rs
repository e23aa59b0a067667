//! Watch command implementation - follow the shared document as it changes.
//!
//! Three cadences from the config drive the loop: reconciliation every
//! `refreshIntervalMs`, sweeps every `cleanupIntervalMs`, and, when a player
//! is given, an active-session check every `sessionCheckIntervalMs`.

use super::output::{JsonPoll, emit, format_poll, format_session};
use super::{CliError, OutputFormat};
use rps_lobby::{ChangeEvent, FileStore, Lobby, PollReport};
use std::thread;
use std::time::{Duration, Instant};

fn describe(event: &ChangeEvent) -> String {
    match event.new_document() {
        Some(doc) => {
            let online = doc.players.values().filter(|p| p.is_online).count();
            let active = doc.game_sessions.values().filter(|s| s.is_active()).count();
            format!(
                "{online} online, {} challenge(s), {active} active game(s), {} queued\n",
                doc.challenges.len(),
                doc.waiting_queue.len()
            )
        }
        None => "lobby is empty\n".to_string(),
    }
}

fn due(last: Option<Instant>, every: Duration) -> bool {
    last.is_none_or(|t| t.elapsed() >= every)
}

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if JSON output fails.
pub(crate) fn execute(
    lobby: &Lobby<FileStore>,
    player: Option<&str>,
    interval: Option<u64>,
    count: Option<u64>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let config = lobby.config();
    let refresh = Duration::from_millis(config.refresh_interval_ms);
    let cleanup = Duration::from_millis(config.cleanup_interval_ms);
    let check = Duration::from_millis(config.session_check_interval_ms);
    let tick = interval.map_or_else(|| refresh.min(cleanup).min(check), Duration::from_millis);

    let _subscription = (format == OutputFormat::Text).then(|| {
        lobby.subscribe(|event| {
            print!("{}", describe(event));
            Ok(())
        })
    });

    let mut last_refresh = None;
    let mut last_cleanup = None;
    let mut last_check = None;
    let mut current_game: Option<String> = None;
    let mut ticks = 0_u64;

    loop {
        let mut report = PollReport::default();
        if due(last_cleanup, cleanup) {
            report = lobby.cleanup();
            last_cleanup = Some(Instant::now());
        }
        if due(last_refresh, refresh) {
            report.changed = lobby.reconcile();
            last_refresh = Some(Instant::now());
        }
        if report != PollReport::default() || format == OutputFormat::Json {
            emit(format, &JsonPoll::from(report), |p| format_poll(p))?;
        }

        if let Some(name) = player.filter(|_| due(last_check, check)) {
            let session = lobby.active_session_for(name);
            let id = session.as_ref().map(|s| s.id.clone());
            if id != current_game {
                match &session {
                    Some(s) => emit(format, s, |s| format!("{name} is playing\n{}", format_session(s)))?,
                    None => emit(format, &serde_json::Value::Null, |_| format!("{name} is not in a game\n"))?,
                }
                current_game = id;
            }
            last_check = Some(Instant::now());
        }

        ticks += 1;
        if count.is_some_and(|limit| ticks >= limit) {
            return Ok(());
        }
        thread::sleep(tick);
    }
}
