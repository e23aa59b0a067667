//! Registered players.

use serde::{Deserialize, Serialize};

use crate::state::Outcome;

/// Lifetime statistics for a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    /// Completed sessions.
    pub games_played: u32,
    /// Sessions won.
    pub wins: u32,
    /// Sessions lost.
    pub losses: u32,
    /// Sessions drawn.
    pub draws: u32,
    /// Current run of consecutive wins.
    pub win_streak: u32,
    /// Longest run of consecutive wins.
    pub best_streak: u32,
}

impl PlayerStats {
    /// Fold one finished session into the statistics.
    ///
    /// A win extends the streak, a loss resets it, a draw leaves it alone.
    pub fn record(&mut self, outcome: Outcome) {
        self.games_played += 1;
        match outcome {
            Outcome::Win => {
                self.wins += 1;
                self.win_streak += 1;
                self.best_streak = self.best_streak.max(self.win_streak);
            }
            Outcome::Lose => {
                self.losses += 1;
                self.win_streak = 0;
            }
            Outcome::Draw => self.draws += 1,
        }
    }

    /// Win percentage rounded to the nearest integer, 0 before any game.
    #[must_use]
    pub fn win_rate(&self) -> u32 {
        if self.games_played == 0 {
            return 0;
        }
        let wins = u64::from(self.wins) * 100;
        let games = u64::from(self.games_played);
        #[allow(clippy::cast_possible_truncation)]
        let rate = ((wins * 2 + games) / (games * 2)) as u32;
        rate
    }
}

/// A player registered by some execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Unique, immutable key.
    pub username: String,
    /// Context that registered the player.
    pub instance_id: String,
    /// Registration time.
    pub joined_at: u64,
    /// Whether the player can be challenged.
    pub is_online: bool,
    /// Lifetime statistics.
    #[serde(default)]
    pub stats: PlayerStats,
}

impl Player {
    /// A freshly registered, online player with empty statistics.
    #[must_use]
    pub fn new(username: impl Into<String>, instance_id: impl Into<String>, joined_at: u64) -> Self {
        Self {
            username: username.into(),
            instance_id: instance_id.into(),
            joined_at,
            is_online: true,
            stats: PlayerStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaks() {
        let mut stats = PlayerStats::default();
        stats.record(Outcome::Win);
        stats.record(Outcome::Win);
        stats.record(Outcome::Draw);
        assert_eq!(stats.win_streak, 2);
        stats.record(Outcome::Win);
        assert_eq!(stats.win_streak, 3);
        assert_eq!(stats.best_streak, 3);
        stats.record(Outcome::Lose);
        assert_eq!(stats.win_streak, 0);
        assert_eq!(stats.best_streak, 3);
        assert_eq!(stats.games_played, 5);
        assert_eq!((stats.wins, stats.losses, stats.draws), (3, 1, 1));
    }

    #[test]
    fn test_win_rate_rounds() {
        let stats = PlayerStats {
            games_played: 3,
            wins: 2,
            ..PlayerStats::default()
        };
        assert_eq!(stats.win_rate(), 67);
        let stats = PlayerStats {
            games_played: 8,
            wins: 1,
            ..PlayerStats::default()
        };
        // 12.5 rounds half up
        assert_eq!(stats.win_rate(), 13);
        assert_eq!(PlayerStats::default().win_rate(), 0);
    }

    #[test]
    fn test_player_json_shape() {
        let player = Player::new("alice", "instance_1_x", 7);
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["instanceId"], "instance_1_x");
        assert_eq!(json["isOnline"], true);
        assert_eq!(json["stats"]["bestStreak"], 0);
    }
}
