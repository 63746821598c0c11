use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Futsal position a player is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Goalkeeper
    Gol,
    /// Defender
    Fix,
    /// Winger
    Ala,
    /// Pivot / forward
    Piv,
}

impl Role {
    /// All roles in formation order
    pub const ALL: [Role; 4] = [Role::Gol, Role::Fix, Role::Ala, Role::Piv];

    /// Number of players of this role a legal lineup must field
    pub const fn required_count(self) -> usize {
        match self {
            Role::Gol | Role::Fix | Role::Piv => 1,
            Role::Ala => 2,
        }
    }

    /// Total players in a legal lineup
    pub const fn lineup_size() -> usize {
        5
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Gol => "GOL",
            Role::Fix => "FIX",
            Role::Ala => "ALA",
            Role::Piv => "PIV",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOL" => Ok(Role::Gol),
            "FIX" => Ok(Role::Fix),
            "ALA" => Ok(Role::Ala),
            "PIV" => Ok(Role::Piv),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Raw per-round performance counters for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatLine {
    pub goals: u32,
    pub assists: u32,
    pub shots_on_target: u32,
    pub tackles: u32,
    pub interceptions: u32,
    pub blocks: u32,
    pub saves: u32,
    pub goals_conceded: u32,
    pub clean_sheet: bool,
    pub penalty_saved: bool,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub fouls_committed: u32,
    pub fouls_suffered: u32,
    pub own_goals: u32,
    pub minutes_played: u32,
}
