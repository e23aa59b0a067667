//! Hand shapes and round resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LobbyError;

/// A player's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    /// Beats scissors.
    Rock,
    /// Beats rock.
    Paper,
    /// Beats paper.
    Scissors,
}

impl Choice {
    /// All three choices.
    pub const ALL: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

    /// The choice this one defeats.
    #[must_use]
    pub const fn beats(self) -> Choice {
        match self {
            Choice::Rock => Choice::Scissors,
            Choice::Paper => Choice::Rock,
            Choice::Scissors => Choice::Paper,
        }
    }

    /// Lowercase name as stored in the document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Choice::Rock => "rock",
            Choice::Paper => "paper",
            Choice::Scissors => "scissors",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = LobbyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" => Ok(Choice::Rock),
            "paper" => Ok(Choice::Paper),
            "scissors" => Ok(Choice::Scissors),
            _ => Err(LobbyError::InvalidChoice(s.to_string())),
        }
    }
}

/// Per-player outcome recorded on a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The player won.
    Win,
    /// The player lost.
    Lose,
    /// Both chose the same.
    Draw,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Win => "win",
            Outcome::Lose => "lose",
            Outcome::Draw => "draw",
        };
        f.write_str(name)
    }
}

/// Result of comparing two choices, seen from the session's player order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundOutcome {
    /// The first player won.
    Player1Wins,
    /// The second player won.
    Player2Wins,
    /// Equal choices.
    Draw,
}

impl RoundOutcome {
    /// Outcomes for (player 1, player 2).
    #[must_use]
    pub const fn outcomes(self) -> (Outcome, Outcome) {
        match self {
            RoundOutcome::Player1Wins => (Outcome::Win, Outcome::Lose),
            RoundOutcome::Player2Wins => (Outcome::Lose, Outcome::Win),
            RoundOutcome::Draw => (Outcome::Draw, Outcome::Draw),
        }
    }
}

/// Compare two choices with the cyclic rule.
#[must_use]
pub fn resolve(first: Choice, second: Choice) -> RoundOutcome {
    if first == second {
        RoundOutcome::Draw
    } else if first.beats() == second {
        RoundOutcome::Player1Wins
    } else {
        RoundOutcome::Player2Wins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_table() {
        use Choice::{Paper, Rock, Scissors};
        let table = [
            (Rock, Rock, RoundOutcome::Draw),
            (Rock, Paper, RoundOutcome::Player2Wins),
            (Rock, Scissors, RoundOutcome::Player1Wins),
            (Paper, Rock, RoundOutcome::Player1Wins),
            (Paper, Paper, RoundOutcome::Draw),
            (Paper, Scissors, RoundOutcome::Player2Wins),
            (Scissors, Rock, RoundOutcome::Player2Wins),
            (Scissors, Paper, RoundOutcome::Player1Wins),
            (Scissors, Scissors, RoundOutcome::Draw),
        ];
        for (a, b, expected) in table {
            assert_eq!(resolve(a, b), expected, "{a} vs {b}");
        }
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!("Rock".parse::<Choice>().unwrap(), Choice::Rock);
        assert_eq!(" scissors ".parse::<Choice>().unwrap(), Choice::Scissors);
        assert_eq!(
            "lizard".parse::<Choice>(),
            Err(LobbyError::InvalidChoice("lizard".into()))
        );
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Choice::Paper).unwrap(), "\"paper\"");
        assert_eq!(serde_json::to_string(&Outcome::Lose).unwrap(), "\"lose\"");
    }
}
