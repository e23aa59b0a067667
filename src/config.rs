//! Lobby configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Storage key holding the shared document.
pub const DEFAULT_STORAGE_KEY: &str = "rps_game_state";

/// Scoring weights for the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringRules {
    /// Points per win (default: 3).
    pub win_points: u32,
    /// Points per draw (default: 1).
    pub draw_points: u32,
    /// Points per loss (default: 0).
    pub loss_points: u32,
    /// Best streak needed before the streak bonus applies (default: 3).
    pub streak_threshold: u32,
    /// Bonus points per game of best streak (default: 2).
    pub streak_multiplier: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            win_points: 3,
            draw_points: 1,
            loss_points: 0,
            streak_threshold: 3,
            streak_multiplier: 2,
        }
    }
}

/// Timing, storage and scoring parameters shared by every lobby component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LobbyConfig {
    /// Key of the shared document in the key/value store.
    pub storage_key: String,
    /// Challenge time-to-live (default: 2 minutes).
    pub challenge_ttl_ms: u64,
    /// How long completed sessions are kept (default: 5 minutes).
    pub session_retention_ms: u64,
    /// Polling reconciliation period (default: 5 seconds).
    pub refresh_interval_ms: u64,
    /// How often a waiting player checks for a started session (default: 3 seconds).
    pub session_check_interval_ms: u64,
    /// Sweep period (default: 10 seconds).
    pub cleanup_interval_ms: u64,
    /// Re-emit a context's own writes to its local subscribers.
    pub self_notify: bool,
    /// Leaderboard scoring.
    pub scoring: ScoringRules,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            challenge_ttl_ms: 2 * 60 * 1000,
            session_retention_ms: 5 * 60 * 1000,
            refresh_interval_ms: 5_000,
            session_check_interval_ms: 3_000,
            cleanup_interval_ms: 10_000,
            self_notify: true,
            scoring: ScoringRules::default(),
        }
    }
}

impl LobbyConfig {
    /// Defaults overridden by `RPS_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `RPS_*` key.
    ///
    /// Unparseable numbers and blank strings are ignored.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let number = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        if let Some(key) = lookup("RPS_STORAGE_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            config.storage_key = key;
        }
        if let Some(ttl) = number("RPS_CHALLENGE_TTL_MS") {
            config.challenge_ttl_ms = ttl;
        }
        if let Some(retention) = number("RPS_SESSION_RETENTION_MS") {
            config.session_retention_ms = retention;
        }
        if let Some(refresh) = number("RPS_REFRESH_INTERVAL_MS") {
            config.refresh_interval_ms = refresh;
        }
        config
    }

    /// Load a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = LobbyConfig::default();
        assert_eq!(config.storage_key, "rps_game_state");
        assert_eq!(config.challenge_ttl_ms, 120_000);
        assert_eq!(config.scoring.win_points, 3);
        assert_eq!(config.scoring.streak_threshold, 3);
        assert!(config.self_notify);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RPS_CHALLENGE_TTL_MS", "1000"),
            ("RPS_SESSION_RETENTION_MS", "not-a-number"),
            ("RPS_STORAGE_KEY", "  "),
        ]
        .into_iter()
        .collect();
        let config = LobbyConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.challenge_ttl_ms, 1000);
        assert_eq!(config.session_retention_ms, 300_000);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LobbyConfig =
            serde_json::from_str(r#"{"challengeTtlMs": 5, "scoring": {"winPoints": 10}}"#).unwrap();
        assert_eq!(config.challenge_ttl_ms, 5);
        assert_eq!(config.scoring.win_points, 10);
        assert_eq!(config.scoring.draw_points, 1);
        assert_eq!(config.refresh_interval_ms, 5_000);
    }
}
