//! Round statistics entry and scoring

use crate::error::StoreError;
use crate::storage::LeagueStore;
use rust_decimal::Decimal;
use scoring_engine::{Role, ScoreCalculator, StatLine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// A saved stat line together with the points it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredStatLine {
    pub round_id: Uuid,
    pub player_id: Uuid,
    pub stats: StatLine,
    pub total_points: Decimal,
}

/// StatDesk is the admin entry point for round statistics.
///
/// Saving a stat line scores it with the shared calculator, persists both,
/// and pushes the new points into every lineup that fields the player.
/// Deleting one takes those points back out.
pub struct StatDesk<'a> {
    store: &'a dyn LeagueStore,
    calculator: ScoreCalculator,
}

impl<'a> StatDesk<'a> {
    pub fn new(store: &'a dyn LeagueStore) -> Self {
        Self { store, calculator: ScoreCalculator::new() }
    }

    /// Points a stat line would earn without persisting anything
    pub fn preview(&self, role: Role, stats: &StatLine) -> Decimal {
        self.calculator.compute_points(role, stats)
    }

    /// Score and store a player's line for a round; returns the points
    pub async fn save(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        stats: StatLine,
    ) -> Result<Decimal, StoreError> {
        let player = self
            .store
            .player(player_id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("player {}", player_id)))?;

        if self.store.round(round_id).await?.is_none() {
            return Err(StoreError::not_found(format!("round {}", round_id)));
        }

        let points = self.calculator.compute_points(player.role, &stats);
        let lineups = self.store.record_stats(round_id, player_id, &stats, points).await?;

        info!(
            round_id = %round_id,
            player = %player.name,
            "Saved stats: {} points, {} lineups updated",
            points,
            lineups
        );
        Ok(points)
    }

    /// Remove a player's line for a round and zero their points in the
    /// round's lineups; returns the number of lineups updated
    pub async fn delete(&self, round_id: Uuid, player_id: Uuid) -> Result<u64, StoreError> {
        let lineups = self.store.remove_stats(round_id, player_id).await?;
        info!(
            round_id = %round_id,
            player_id = %player_id,
            "Deleted stats, {} lineups updated",
            lineups
        );
        Ok(lineups)
    }

    /// All scored lines of a round, highest first
    pub async fn round_sheet(&self, round_id: Uuid) -> Result<Vec<ScoredStatLine>, StoreError> {
        let sheet = self.store.round_stat_lines(round_id).await?;
        debug!(round_id = %round_id, "Loaded {} stat lines", sheet.len());
        Ok(sheet)
    }
}
