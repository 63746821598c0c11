//! Persisted lineups

use crate::credits::Credits;
use crate::error::StoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One player of a committed lineup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupEntry {
    pub player_id: Uuid,
    pub is_starter: bool,
    pub points: Decimal,
}

impl LineupEntry {
    /// A starter that has not scored yet
    pub fn starter(player_id: Uuid) -> Self {
        Self { player_id, is_starter: true, points: Decimal::ZERO }
    }
}

/// CommittedLineup is the finalized lineup of a user for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedLineup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub round_id: Uuid,
    pub entries: Vec<LineupEntry>,
    pub total_points: Decimal,
    /// Credits charged for this lineup, refunded when it is replaced
    pub spent: Credits,
}

impl CommittedLineup {
    pub fn contains(&self, player_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.player_id == player_id)
    }

    pub fn recompute_total(&mut self) {
        self.total_points = self.entries.iter().map(|e| e.points).sum();
    }
}

/// Request to replace the (user, round) lineup and charge for it
#[derive(Debug, Clone, PartialEq)]
pub struct LineupCommit {
    pub user_id: Uuid,
    pub round_id: Uuid,
    pub entries: Vec<LineupEntry>,
    pub cost: Credits,
}

impl LineupCommit {
    /// Balance after this commit.
    ///
    /// The lineup being replaced is refunded first, so re-issuing the same
    /// commit settles to the same balance instead of charging twice.
    pub fn settle(&self, balance: Credits, previous_spent: Credits) -> Result<Credits, StoreError> {
        let available = balance + previous_spent;
        if self.cost > available {
            return Err(StoreError::InsufficientBalance { required: self.cost, available });
        }
        Ok(available - self.cost)
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    pub lineup_id: Uuid,
    pub balance: Credits,
}
