//! League rounds and their market status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Round status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Upcoming,
    Active,
    Finished,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Upcoming => "upcoming",
            RoundStatus::Active => "active",
            RoundStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown round status: {0}")]
pub struct RoundStatusParseError(pub String);

impl FromStr for RoundStatus {
    type Err = RoundStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(RoundStatus::Upcoming),
            "active" => Ok(RoundStatus::Active),
            "finished" => Ok(RoundStatus::Finished),
            other => Err(RoundStatusParseError(other.to_string())),
        }
    }
}

impl std::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round represents one matchday of the league
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: Uuid,
    pub name: String,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
}

impl Round {
    /// Create a new upcoming round
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: RoundStatus::Upcoming,
            created_at: Utc::now(),
        }
    }

    /// Lineups can only be committed while the round is active
    pub fn is_market_open(&self) -> bool {
        self.status == RoundStatus::Active
    }
}
