//! Output formatting utilities for CLI.

use super::{CliError, OutputFormat};
use rps_lobby::{
    Challenge, ChallengeOutcome, ChoiceReceipt, GameSession, LeaderboardEntry, Player, PollReport,
    WaitingQueueEntry,
};
use serde::Serialize;

/// Print `value` as pretty JSON, or the text rendering of it.
pub(super) fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => print!("{}", text(value)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// JSON-serializable result of a challenge request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JsonChallengeOutcome<'a> {
    /// `issued` or `queued`.
    pub(super) status: &'static str,
    /// The issued challenge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) challenge: Option<&'a Challenge>,
    /// The queue entry when the target was busy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) queued: Option<&'a WaitingQueueEntry>,
    /// Whether the queue entry is new.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) newly_queued: Option<bool>,
}

impl<'a> JsonChallengeOutcome<'a> {
    /// Create from a coordinator outcome.
    pub(super) fn from_outcome(outcome: &'a ChallengeOutcome) -> Self {
        match outcome {
            ChallengeOutcome::Issued(challenge) => Self {
                status: "issued",
                challenge: Some(challenge),
                queued: None,
                newly_queued: None,
            },
            ChallengeOutcome::Queued {
                entry,
                newly_queued,
            } => Self {
                status: "queued",
                challenge: None,
                queued: Some(entry),
                newly_queued: Some(*newly_queued),
            },
        }
    }
}

/// JSON-serializable result of a choice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JsonChoice<'a> {
    /// Session after the choice.
    pub(super) session: &'a GameSession,
    /// Challenges delivered from the waiting queue.
    pub(super) delivered: &'a [Challenge],
}

impl<'a> JsonChoice<'a> {
    /// Create from a choice receipt.
    pub(super) fn from_receipt(receipt: &'a ChoiceReceipt) -> Self {
        Self {
            session: &receipt.session,
            delivered: &receipt.delivered,
        }
    }
}

/// JSON-serializable poll pass.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JsonPoll {
    /// Expired pending challenges removed.
    pub(super) expired_challenges: usize,
    /// Replay pins cleared.
    pub(super) cleared_replays: usize,
    /// Completed sessions purged.
    pub(super) purged_sessions: usize,
    /// Whether the document changed since the last poll.
    pub(super) changed: bool,
}

impl From<PollReport> for JsonPoll {
    fn from(report: PollReport) -> Self {
        Self {
            expired_challenges: report.expired_challenges,
            cleared_replays: report.cleared_replays,
            purged_sessions: report.purged_sessions,
            changed: report.changed,
        }
    }
}

/// Format one player line.
pub(super) fn format_player(player: &Player) -> String {
    let stats = &player.stats;
    format!(
        "{} [{}] {}W/{}L/{}D streak {}\n",
        player.username,
        if player.is_online { "online" } else { "offline" },
        stats.wins,
        stats.losses,
        stats.draws,
        stats.win_streak
    )
}

/// Format a list of players.
pub(super) fn format_players(players: &[Player]) -> String {
    if players.is_empty() {
        return "No players online\n".to_string();
    }
    players.iter().map(format_player).collect()
}

/// Format one challenge line.
pub(super) fn format_challenge(challenge: &Challenge) -> String {
    let mut output = format!(
        "{}: {} -> {} ({}",
        challenge.id, challenge.challenger, challenge.challenged, challenge.status
    );
    if let Some(session) = &challenge.game_session_id {
        output.push_str(&format!(", game {session}"));
    }
    output.push_str(")\n");
    output
}

/// Format a list of challenges.
pub(super) fn format_challenges(challenges: &[Challenge]) -> String {
    if challenges.is_empty() {
        return "No open challenges\n".to_string();
    }
    challenges.iter().map(format_challenge).collect()
}

/// Format a challenge request result.
pub(super) fn format_outcome(outcome: &JsonChallengeOutcome<'_>) -> String {
    match (outcome.challenge, outcome.queued) {
        (Some(challenge), _) => format!("Challenge issued: {}", format_challenge(challenge)),
        (None, Some(entry)) if outcome.newly_queued == Some(false) => format!(
            "{} is in a game; {} is already queued ({})\n",
            entry.target_player, entry.waiting_player, entry.id
        ),
        (None, Some(entry)) => format!(
            "{} is in a game; {} queued ({})\n",
            entry.target_player, entry.waiting_player, entry.id
        ),
        (None, None) => String::new(),
    }
}

/// Format a game session.
pub(super) fn format_session(session: &GameSession) -> String {
    let mut output = String::new();

    output.push_str(&format!("Game {} ({})\n", session.id, session.status));
    for name in &session.players {
        let choice = match (session.is_active(), session.choices.get(name)) {
            (_, None) => "waiting".to_string(),
            (true, Some(_)) => "chosen".to_string(),
            (false, Some(choice)) => choice.to_string(),
        };
        output.push_str(&format!("  {name}: {choice}"));
        if let Some(outcome) = session.result.as_ref().and_then(|r| r.get(name)) {
            output.push_str(&format!(" [{outcome}]"));
        }
        output.push('\n');
    }
    if !session.is_active() {
        match &session.winner {
            Some(winner) => output.push_str(&format!("  Winner: {winner}\n")),
            None => output.push_str("  Winner: Draw\n"),
        }
    }
    if let Some(replay) = &session.replay_request {
        output.push_str(&format!(
            "  Rematch requested by {} ({})\n",
            replay.from, replay.challenge_id
        ));
    }

    output
}

/// Format a choice receipt.
pub(super) fn format_choice(choice: &JsonChoice<'_>) -> String {
    let mut output = format_session(choice.session);
    for challenge in choice.delivered {
        output.push_str(&format!("Queued challenge delivered: {}", format_challenge(challenge)));
    }
    output
}

/// Format the leaderboard as a table.
pub(super) fn format_leaderboard(entries: &[LeaderboardEntry]) -> String {
    let mut output = String::new();

    output.push_str("Rank  Player              Score  Win%  W/L/D        Streak\n");
    output.push_str("==========================================================\n");
    for entry in entries {
        output.push_str(&format!(
            "{:<5} {:<19} {:>5}  {:>3}%  {:<12} {}{}\n",
            entry.rank,
            entry.username,
            entry.score,
            entry.win_rate,
            format!("{}/{}/{}", entry.wins, entry.losses, entry.draws),
            entry.win_streak,
            if entry.is_online { "" } else { " (offline)" }
        ));
    }

    output
}

/// Format the waiting queue.
pub(super) fn format_queue(entries: &[WaitingQueueEntry]) -> String {
    if entries.is_empty() {
        return "Waiting queue is empty\n".to_string();
    }
    entries
        .iter()
        .map(|e| format!("{}: {} waits for {}\n", e.id, e.waiting_player, e.target_player))
        .collect()
}

/// Format a poll pass.
pub(super) fn format_poll(poll: &JsonPoll) -> String {
    let mut output = String::new();
    if poll.expired_challenges > 0 {
        output.push_str(&format!("Removed {} expired challenge(s)\n", poll.expired_challenges));
    }
    if poll.cleared_replays > 0 {
        output.push_str(&format!("Cleared {} stale replay request(s)\n", poll.cleared_replays));
    }
    if poll.purged_sessions > 0 {
        output.push_str(&format!("Purged {} completed session(s)\n", poll.purged_sessions));
    }
    if poll.changed {
        output.push_str("Lobby changed\n");
    }
    output
}
