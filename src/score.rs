//! Leaderboard scoring and ranking.
//!
//! `score = wins * win_points + draws * draw_points + losses * loss_points
//!        + (best_streak >= streak_threshold ? best_streak * streak_multiplier : 0)`
//!
//! Ranking sorts by `(score desc, win_rate desc, games_played desc)` with a
//! stable sort, so entries equal on all three keys keep the order in which
//! they were supplied. The document supplies players ordered by username, which
//! makes the final order reproducible from player state alone.

use crate::config::ScoringRules;
use crate::state::{Document, LeaderboardEntry, Player, PlayerStats};

/// Score for one set of statistics.
#[must_use]
pub fn score(stats: &PlayerStats, rules: &ScoringRules) -> u64 {
    let base = u64::from(stats.wins) * u64::from(rules.win_points)
        + u64::from(stats.draws) * u64::from(rules.draw_points)
        + u64::from(stats.losses) * u64::from(rules.loss_points);
    let bonus = if stats.best_streak >= rules.streak_threshold {
        u64::from(stats.best_streak) * u64::from(rules.streak_multiplier)
    } else {
        0
    };
    base + bonus
}

/// Rank `players` into leaderboard rows.
#[must_use]
pub fn rank<'a, I>(players: I, rules: &ScoringRules) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Player>,
{
    let mut entries: Vec<LeaderboardEntry> = players
        .into_iter()
        .map(|p| LeaderboardEntry {
            rank: 0,
            username: p.username.clone(),
            score: score(&p.stats, rules),
            win_rate: p.stats.win_rate(),
            games_played: p.stats.games_played,
            wins: p.stats.wins,
            losses: p.stats.losses,
            draws: p.stats.draws,
            win_streak: p.stats.win_streak,
            best_streak: p.stats.best_streak,
            is_online: p.is_online,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.win_rate.cmp(&a.win_rate))
            .then(b.games_played.cmp(&a.games_played))
    });

    for (position, entry) in (1u32..).zip(entries.iter_mut()) {
        entry.rank = position;
    }
    entries
}

/// Recompute the cached leaderboard from the document's players.
pub fn refresh(doc: &mut Document, rules: &ScoringRules) {
    doc.leaderboard = rank(doc.players.values(), rules);
}
