//! Storage abstraction for the league and its backends

pub mod memory;
pub mod postgres;

pub use memory::InMemoryLeagueStore;
pub use postgres::PgLeagueStore;

use crate::credits::Credits;
use crate::error::StoreError;
use crate::lineup::{CommitReceipt, CommittedLineup, LineupCommit, LineupEntry};
use crate::player::Player;
use crate::round::Round;
use crate::standings::{LineupSummary, RankingEntry};
use crate::stats::ScoredStatLine;
use rust_decimal::Decimal;
use scoring_engine::StatLine;
use uuid::Uuid;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Abstract trait for league storage backends
#[async_trait::async_trait]
pub trait LeagueStore: Send + Sync {
    /// Register a user with a starting balance
    async fn create_user(&self, user_id: Uuid, team_name: &str, credits: Credits)
        -> StoreResult<()>;

    /// Current balance of a user
    async fn user_budget(&self, user_id: Uuid) -> StoreResult<Credits>;

    async fn set_user_budget(&self, user_id: Uuid, budget: Credits) -> StoreResult<()>;

    /// The single active round, if any
    async fn active_round(&self) -> StoreResult<Option<Round>>;

    async fn round(&self, round_id: Uuid) -> StoreResult<Option<Round>>;

    async fn create_round(&self, round: &Round) -> StoreResult<()>;

    /// All rounds, newest first
    async fn list_rounds(&self) -> StoreResult<Vec<Round>>;

    /// Make `round_id` the only active round
    async fn activate_round(&self, round_id: Uuid) -> StoreResult<Round>;

    async fn finish_round(&self, round_id: Uuid) -> StoreResult<Round>;

    /// Full player catalog
    async fn roster(&self) -> StoreResult<Vec<Player>>;

    async fn player(&self, player_id: Uuid) -> StoreResult<Option<Player>>;

    async fn upsert_player(&self, player: &Player) -> StoreResult<()>;

    /// Remove a player from the catalog together with their stat lines.
    ///
    /// Fails with `Conflict` while any committed lineup fields the player.
    async fn delete_player(&self, player_id: Uuid) -> StoreResult<()>;

    /// Remove a round with its lineups and stat lines, refreshing the player
    /// and user totals they fed. The active round cannot be removed.
    async fn delete_round(&self, round_id: Uuid) -> StoreResult<()>;

    /// Users by total points, best first, at most `limit` rows
    async fn ranking(&self, limit: usize) -> StoreResult<Vec<RankingEntry>>;

    /// Every lineup a user committed, newest round first
    async fn user_lineups(&self, user_id: Uuid) -> StoreResult<Vec<LineupSummary>>;

    async fn committed_lineup(
        &self,
        user_id: Uuid,
        round_id: Uuid,
    ) -> StoreResult<Option<CommittedLineup>>;

    /// Create the (user, round) lineup or swap its whole player set
    async fn replace_committed_lineup(
        &self,
        user_id: Uuid,
        round_id: Uuid,
        entries: &[LineupEntry],
        spent: Credits,
    ) -> StoreResult<Uuid>;

    async fn delete_committed_lineup(&self, user_id: Uuid, round_id: Uuid) -> StoreResult<()>;

    async fn stat_line(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<Option<StatLine>>;

    /// Store a stat line with its computed points and refresh the player's
    /// cumulative total and average
    async fn save_stat_line(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<()>;

    /// Remove a stat line and refresh the player's cumulative total and
    /// average (both cleared when no line remains)
    async fn delete_stat_line(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<()>;

    /// Stat lines of a round, highest points first
    async fn round_stat_lines(&self, round_id: Uuid) -> StoreResult<Vec<ScoredStatLine>>;

    /// Write a player's round points into every lineup that fields them and
    /// refresh the owners' total points.
    ///
    /// Returns the number of lineups updated.
    async fn apply_player_points(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        points: Decimal,
    ) -> StoreResult<u64>;

    /// Save a stat line and push its points into the round's lineups.
    ///
    /// The default runs the two writes one after the other; a failure in
    /// between leaves the stat line saved with stale lineup points until the
    /// line is saved again. Both shipped backends override it atomically.
    async fn record_stats(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<u64> {
        self.save_stat_line(round_id, player_id, stats, points).await?;
        self.apply_player_points(round_id, player_id, points).await
    }

    /// Remove a stat line and zero the player's points in the round's lineups
    async fn remove_stats(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<u64> {
        self.delete_stat_line(round_id, player_id).await?;
        self.apply_player_points(round_id, player_id, Decimal::ZERO).await
    }

    /// Replace the lineup and charge for it as one logical transaction.
    ///
    /// Backends with native transactions override this. The default runs a
    /// compensable sequence: swap the player set, then write the balance, and
    /// put the previous player set back if the balance write fails.
    async fn commit_lineup(&self, commit: &LineupCommit) -> StoreResult<CommitReceipt> {
        let previous = self.committed_lineup(commit.user_id, commit.round_id).await?;
        let balance = self.user_budget(commit.user_id).await?;
        let previous_spent = previous.as_ref().map(|l| l.spent).unwrap_or(Credits::ZERO);
        let new_balance = commit.settle(balance, previous_spent)?;

        let lineup_id = self
            .replace_committed_lineup(commit.user_id, commit.round_id, &commit.entries, commit.cost)
            .await?;

        if let Err(err) = self.set_user_budget(commit.user_id, new_balance).await {
            let restored = match &previous {
                Some(lineup) => self
                    .replace_committed_lineup(
                        commit.user_id,
                        commit.round_id,
                        &lineup.entries,
                        lineup.spent,
                    )
                    .await
                    .map(|_| ()),
                None => self.delete_committed_lineup(commit.user_id, commit.round_id).await,
            };
            if let Err(restore_err) = restored {
                tracing::error!(
                    user_id = %commit.user_id,
                    round_id = %commit.round_id,
                    "Failed to restore lineup after balance update error: {}",
                    restore_err
                );
            }
            return Err(err);
        }

        Ok(CommitReceipt { lineup_id, balance: new_balance })
    }
}
