//! In-memory league store (for testing and demos)

use super::{LeagueStore, StoreResult};
use crate::credits::Credits;
use crate::error::StoreError;
use crate::lineup::{CommitReceipt, CommittedLineup, LineupCommit, LineupEntry};
use crate::player::Player;
use crate::round::{Round, RoundStatus};
use crate::standings::{LineupSummary, RankingEntry};
use crate::stats::ScoredStatLine;
use rust_decimal::{Decimal, RoundingStrategy};
use scoring_engine::StatLine;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct UserAccount {
    team_name: String,
    credits: Credits,
    total_points: Decimal,
}

#[derive(Debug, Default)]
struct LeagueState {
    users: HashMap<Uuid, UserAccount>,
    players: HashMap<Uuid, Player>,
    rounds: HashMap<Uuid, Round>,
    lineups: HashMap<(Uuid, Uuid), CommittedLineup>,
    stats: HashMap<(Uuid, Uuid), ScoredStatLine>,
}

impl LeagueState {
    fn credits(&self, user_id: Uuid) -> StoreResult<Credits> {
        self.users
            .get(&user_id)
            .map(|u| u.credits)
            .ok_or_else(|| StoreError::not_found(format!("user {}", user_id)))
    }

    fn replace_lineup(
        &mut self,
        user_id: Uuid,
        round_id: Uuid,
        entries: &[LineupEntry],
        spent: Credits,
    ) -> Uuid {
        let lineup = self.lineups.entry((user_id, round_id)).or_insert_with(|| CommittedLineup {
            id: Uuid::new_v4(),
            user_id,
            round_id,
            entries: Vec::new(),
            total_points: Decimal::ZERO,
            spent: Credits::ZERO,
        });
        lineup.entries = entries.to_vec();
        lineup.spent = spent;
        lineup.recompute_total();
        let lineup_id = lineup.id;
        self.refresh_user_total(user_id);
        lineup_id
    }

    fn set_status(&mut self, round_id: Uuid, status: RoundStatus) -> StoreResult<Round> {
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| StoreError::not_found(format!("round {}", round_id)))?;
        round.status = status;
        Ok(round.clone())
    }

    fn write_stat_line(
        &mut self,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<()> {
        if !self.players.contains_key(&player_id) {
            return Err(StoreError::not_found(format!("player {}", player_id)));
        }
        self.stats.insert(
            (round_id, player_id),
            ScoredStatLine { round_id, player_id, stats: *stats, total_points: points },
        );
        self.refresh_player_totals(player_id);
        Ok(())
    }

    fn remove_stat_line(&mut self, round_id: Uuid, player_id: Uuid) -> StoreResult<()> {
        if self.stats.remove(&(round_id, player_id)).is_none() {
            return Err(StoreError::not_found(format!(
                "stat line for player {} in round {}",
                player_id, round_id
            )));
        }
        self.refresh_player_totals(player_id);
        Ok(())
    }

    fn write_player_points(&mut self, round_id: Uuid, player_id: Uuid, points: Decimal) -> u64 {
        let mut owners = Vec::new();
        for lineup in self.lineups.values_mut().filter(|l| l.round_id == round_id) {
            let mut touched = false;
            for entry in lineup.entries.iter_mut().filter(|e| e.player_id == player_id) {
                entry.points = points;
                touched = true;
            }
            if touched {
                lineup.recompute_total();
                owners.push(lineup.user_id);
            }
        }
        for user_id in &owners {
            self.refresh_user_total(*user_id);
        }
        owners.len() as u64
    }

    /// Cumulative total and 2dp average over every stored line of a player
    fn refresh_player_totals(&mut self, player_id: Uuid) {
        let totals: Vec<Decimal> = self
            .stats
            .values()
            .filter(|s| s.player_id == player_id)
            .map(|s| s.total_points)
            .collect();
        let (total, average) = if totals.is_empty() {
            (None, None)
        } else {
            let total: Decimal = totals.iter().copied().sum();
            let average = (total / Decimal::from(totals.len()))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            (Some(total), Some(average))
        };

        if let Some(player) = self.players.get_mut(&player_id) {
            player.total_points = total;
            player.average_points = average;
        }
    }

    fn refresh_user_total(&mut self, user_id: Uuid) {
        let total: Decimal = self
            .lineups
            .values()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.total_points)
            .sum();
        if let Some(user) = self.users.get_mut(&user_id) {
            user.total_points = total;
        }
    }
}

/// League store kept entirely in process memory.
///
/// Every operation runs under one lock, so multi-step writes such as
/// `commit_lineup` are applied all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLeagueStore {
    state: Arc<RwLock<LeagueState>>,
}

impl InMemoryLeagueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LeagueStore for InMemoryLeagueStore {
    async fn create_user(
        &self,
        user_id: Uuid,
        team_name: &str,
        credits: Credits,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.users.insert(
            user_id,
            UserAccount { team_name: team_name.to_string(), credits, total_points: Decimal::ZERO },
        );
        Ok(())
    }

    async fn user_budget(&self, user_id: Uuid) -> StoreResult<Credits> {
        self.state.read().await.credits(user_id)
    }

    async fn set_user_budget(&self, user_id: Uuid, budget: Credits) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found(format!("user {}", user_id)))?;
        user.credits = budget;
        Ok(())
    }

    async fn active_round(&self) -> StoreResult<Option<Round>> {
        let state = self.state.read().await;
        Ok(state.rounds.values().find(|r| r.status == RoundStatus::Active).cloned())
    }

    async fn round(&self, round_id: Uuid) -> StoreResult<Option<Round>> {
        Ok(self.state.read().await.rounds.get(&round_id).cloned())
    }

    async fn create_round(&self, round: &Round) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if round.status == RoundStatus::Active {
            for other in state.rounds.values_mut() {
                if other.status == RoundStatus::Active {
                    other.status = RoundStatus::Upcoming;
                }
            }
        }
        state.rounds.insert(round.id, round.clone());
        Ok(())
    }

    async fn list_rounds(&self) -> StoreResult<Vec<Round>> {
        let state = self.state.read().await;
        let mut rounds: Vec<Round> = state.rounds.values().cloned().collect();
        rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rounds)
    }

    async fn activate_round(&self, round_id: Uuid) -> StoreResult<Round> {
        let mut state = self.state.write().await;
        if !state.rounds.contains_key(&round_id) {
            return Err(StoreError::not_found(format!("round {}", round_id)));
        }
        for round in state.rounds.values_mut() {
            if round.id != round_id && round.status == RoundStatus::Active {
                round.status = RoundStatus::Upcoming;
            }
        }
        state.set_status(round_id, RoundStatus::Active)
    }

    async fn finish_round(&self, round_id: Uuid) -> StoreResult<Round> {
        self.state.write().await.set_status(round_id, RoundStatus::Finished)
    }

    async fn roster(&self) -> StoreResult<Vec<Player>> {
        let state = self.state.read().await;
        let mut players: Vec<Player> = state.players.values().cloned().collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }

    async fn player(&self, player_id: Uuid) -> StoreResult<Option<Player>> {
        Ok(self.state.read().await.players.get(&player_id).cloned())
    }

    async fn upsert_player(&self, player: &Player) -> StoreResult<()> {
        self.state.write().await.players.insert(player.id, player.clone());
        Ok(())
    }

    async fn delete_player(&self, player_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.players.contains_key(&player_id) {
            return Err(StoreError::not_found(format!("player {}", player_id)));
        }
        if state.lineups.values().any(|l| l.contains(player_id)) {
            return Err(StoreError::conflict(format!(
                "player {} is fielded in a committed lineup",
                player_id
            )));
        }
        state.players.remove(&player_id);
        state.stats.retain(|_, line| line.player_id != player_id);
        Ok(())
    }

    async fn delete_round(&self, round_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.rounds.get(&round_id) {
            None => return Err(StoreError::not_found(format!("round {}", round_id))),
            Some(round) if round.status == RoundStatus::Active => {
                return Err(StoreError::conflict(format!("round {} is active", round.name)));
            }
            Some(_) => {}
        }
        state.rounds.remove(&round_id);

        let owners: HashSet<Uuid> =
            state.lineups.values().filter(|l| l.round_id == round_id).map(|l| l.user_id).collect();
        state.lineups.retain(|_, l| l.round_id != round_id);

        let scored: HashSet<Uuid> =
            state.stats.values().filter(|s| s.round_id == round_id).map(|s| s.player_id).collect();
        state.stats.retain(|_, s| s.round_id != round_id);

        for user_id in owners {
            state.refresh_user_total(user_id);
        }
        for player_id in scored {
            state.refresh_player_totals(player_id);
        }
        Ok(())
    }

    async fn ranking(&self, limit: usize) -> StoreResult<Vec<RankingEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<RankingEntry> = state
            .users
            .iter()
            .map(|(user_id, user)| RankingEntry {
                user_id: *user_id,
                team_name: user.team_name.clone(),
                total_points: user.total_points,
                credits: user.credits,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.total_points.cmp(&a.total_points).then_with(|| a.team_name.cmp(&b.team_name))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    async fn user_lineups(&self, user_id: Uuid) -> StoreResult<Vec<LineupSummary>> {
        let state = self.state.read().await;
        let mut history: Vec<(&Round, LineupSummary)> = state
            .lineups
            .values()
            .filter(|l| l.user_id == user_id)
            .filter_map(|l| {
                let round = state.rounds.get(&l.round_id)?;
                Some((
                    round,
                    LineupSummary {
                        lineup_id: l.id,
                        round_id: round.id,
                        round_name: round.name.clone(),
                        round_status: round.status,
                        total_points: l.total_points,
                        spent: l.spent,
                    },
                ))
            })
            .collect();
        history.sort_by(|(a, _), (b, _)| b.created_at.cmp(&a.created_at));
        Ok(history.into_iter().map(|(_, summary)| summary).collect())
    }

    async fn committed_lineup(
        &self,
        user_id: Uuid,
        round_id: Uuid,
    ) -> StoreResult<Option<CommittedLineup>> {
        Ok(self.state.read().await.lineups.get(&(user_id, round_id)).cloned())
    }

    async fn replace_committed_lineup(
        &self,
        user_id: Uuid,
        round_id: Uuid,
        entries: &[LineupEntry],
        spent: Credits,
    ) -> StoreResult<Uuid> {
        Ok(self.state.write().await.replace_lineup(user_id, round_id, entries, spent))
    }

    async fn delete_committed_lineup(&self, user_id: Uuid, round_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.lineups.remove(&(user_id, round_id));
        state.refresh_user_total(user_id);
        Ok(())
    }

    async fn stat_line(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<Option<StatLine>> {
        let state = self.state.read().await;
        Ok(state.stats.get(&(round_id, player_id)).map(|s| s.stats))
    }

    async fn save_stat_line(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<()> {
        self.state.write().await.write_stat_line(round_id, player_id, stats, points)
    }

    async fn delete_stat_line(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<()> {
        self.state.write().await.remove_stat_line(round_id, player_id)
    }

    async fn round_stat_lines(&self, round_id: Uuid) -> StoreResult<Vec<ScoredStatLine>> {
        let state = self.state.read().await;
        let mut lines: Vec<ScoredStatLine> =
            state.stats.values().filter(|s| s.round_id == round_id).cloned().collect();
        lines.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        Ok(lines)
    }

    async fn apply_player_points(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        points: Decimal,
    ) -> StoreResult<u64> {
        Ok(self.state.write().await.write_player_points(round_id, player_id, points))
    }

    async fn record_stats(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        state.write_stat_line(round_id, player_id, stats, points)?;
        Ok(state.write_player_points(round_id, player_id, points))
    }

    async fn remove_stats(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        state.remove_stat_line(round_id, player_id)?;
        Ok(state.write_player_points(round_id, player_id, Decimal::ZERO))
    }

    async fn commit_lineup(&self, commit: &LineupCommit) -> StoreResult<CommitReceipt> {
        let mut state = self.state.write().await;
        let balance = state.credits(commit.user_id)?;
        let previous_spent = state
            .lineups
            .get(&(commit.user_id, commit.round_id))
            .map(|l| l.spent)
            .unwrap_or(Credits::ZERO);
        let new_balance = commit.settle(balance, previous_spent)?;

        let lineup_id =
            state.replace_lineup(commit.user_id, commit.round_id, &commit.entries, commit.cost);
        if let Some(user) = state.users.get_mut(&commit.user_id) {
            user.credits = new_balance;
        }

        Ok(CommitReceipt { lineup_id, balance: new_balance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoring_engine::Role;

    #[tokio::test]
    async fn test_activate_round_keeps_single_active() {
        let store = InMemoryLeagueStore::new();
        let first = Round::new("Rodada 1");
        let second = Round::new("Rodada 2");
        store.create_round(&first).await.unwrap();
        store.create_round(&second).await.unwrap();

        store.activate_round(first.id).await.unwrap();
        store.activate_round(second.id).await.unwrap();

        let rounds = store.list_rounds().await.unwrap();
        let active: Vec<_> = rounds.iter().filter(|r| r.status == RoundStatus::Active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
        assert_eq!(store.round(first.id).await.unwrap().unwrap().status, RoundStatus::Upcoming);
    }

    #[tokio::test]
    async fn test_activate_keeps_finished_rounds_finished() {
        let store = InMemoryLeagueStore::new();
        let done = Round::new("Rodada 1");
        let next = Round::new("Rodada 2");
        store.create_round(&done).await.unwrap();
        store.create_round(&next).await.unwrap();
        store.finish_round(done.id).await.unwrap();

        store.activate_round(next.id).await.unwrap();
        assert_eq!(store.round(done.id).await.unwrap().unwrap().status, RoundStatus::Finished);
    }

    #[tokio::test]
    async fn test_unknown_round() {
        let store = InMemoryLeagueStore::new();
        let err = store.activate_round(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_stat_line_updates_player_average() {
        let store = InMemoryLeagueStore::new();
        let player = Player::new("Ferrão", "Barcelona", Role::Piv, Credits::from_cents(950));
        store.upsert_player(&player).await.unwrap();

        let stats = StatLine { goals: 1, ..Default::default() };
        store.save_stat_line(Uuid::new_v4(), player.id, &stats, Decimal::from(8)).await.unwrap();
        store.save_stat_line(Uuid::new_v4(), player.id, &stats, Decimal::from(4)).await.unwrap();

        let stored = store.player(player.id).await.unwrap().unwrap();
        assert_eq!(stored.total_points, Some(Decimal::from(12)));
        assert_eq!(stored.average_points, Some(Decimal::from(6)));
    }

    #[tokio::test]
    async fn test_player_average_is_rounded_to_cents() {
        let store = InMemoryLeagueStore::new();
        let player = Player::new("Rodrigo", "Magnus", Role::Fix, Credits::from_cents(700));
        store.upsert_player(&player).await.unwrap();

        let stats = StatLine::default();
        for points in [4, 3, 3] {
            store
                .save_stat_line(Uuid::new_v4(), player.id, &stats, Decimal::from(points))
                .await
                .unwrap();
        }

        let stored = store.player(player.id).await.unwrap().unwrap();
        assert_eq!(stored.total_points, Some(Decimal::from(10)));
        assert_eq!(stored.average_points, Some(Decimal::new(333, 2)));
    }

    #[tokio::test]
    async fn test_delete_stat_line_clears_player_totals() {
        let store = InMemoryLeagueStore::new();
        let player = Player::new("Dyego", "Barcelona", Role::Ala, Credits::from_cents(600));
        store.upsert_player(&player).await.unwrap();
        let round_id = Uuid::new_v4();

        store.save_stat_line(round_id, player.id, &StatLine::default(), Decimal::from(5)).await.unwrap();
        store.delete_stat_line(round_id, player.id).await.unwrap();

        let stored = store.player(player.id).await.unwrap().unwrap();
        assert_eq!(stored.total_points, None);
        assert_eq!(stored.average_points, None);
        assert!(store.stat_line(round_id, player.id).await.unwrap().is_none());

        let err = store.delete_stat_line(round_id, player.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_points_updates_user_total() {
        let store = InMemoryLeagueStore::new();
        let user_id = Uuid::new_v4();
        store.create_user(user_id, "Os Boleiros", Credits::from_cents(4000)).await.unwrap();
        let player = Player::new("Ferrão", "Barcelona", Role::Piv, Credits::from_cents(950));
        store.upsert_player(&player).await.unwrap();

        let first = Round::new("Rodada 1");
        let second = Round::new("Rodada 2");
        store.create_round(&first).await.unwrap();
        store.create_round(&second).await.unwrap();
        for round in [&first, &second] {
            store
                .replace_committed_lineup(
                    user_id,
                    round.id,
                    &[LineupEntry::starter(player.id)],
                    Credits::from_cents(950),
                )
                .await
                .unwrap();
        }

        store.apply_player_points(first.id, player.id, Decimal::from(8)).await.unwrap();
        store.apply_player_points(second.id, player.id, Decimal::from(5)).await.unwrap();

        let table = store.ranking(20).await.unwrap();
        assert_eq!(table[0].total_points, Decimal::from(13));

        store.delete_round(first.id).await.unwrap();
        let table = store.ranking(20).await.unwrap();
        assert_eq!(table[0].total_points, Decimal::from(5));
        assert!(store.committed_lineup(user_id, first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ranking_orders_and_limits() {
        let store = InMemoryLeagueStore::new();
        let player = Player::new("Guitta", "Magnus", Role::Gol, Credits::from_cents(800));
        store.upsert_player(&player).await.unwrap();
        let round = Round::new("Rodada 1");
        store.create_round(&round).await.unwrap();

        for (team, points) in [("Bravos", 3), ("Amigos", 9), ("Cobras", 6)] {
            let user_id = Uuid::new_v4();
            store.create_user(user_id, team, Credits::from_cents(4000)).await.unwrap();
            let mut entry = LineupEntry::starter(player.id);
            entry.points = Decimal::from(points);
            store.replace_committed_lineup(user_id, round.id, &[entry], Credits::ZERO).await.unwrap();
        }
        store.create_user(Uuid::new_v4(), "Dragões", Credits::from_cents(4000)).await.unwrap();

        let table = store.ranking(3).await.unwrap();
        let teams: Vec<&str> = table.iter().map(|e| e.team_name.as_str()).collect();
        assert_eq!(teams, vec!["Amigos", "Cobras", "Bravos"]);
        assert_eq!(store.ranking(20).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_player_fielded_in_lineup() {
        let store = InMemoryLeagueStore::new();
        let fielded = Player::new("Arthur", "Magnus", Role::Ala, Credits::from_cents(500));
        let benched = Player::new("Pito", "Magnus", Role::Ala, Credits::from_cents(1000));
        store.upsert_player(&fielded).await.unwrap();
        store.upsert_player(&benched).await.unwrap();
        let round_id = Uuid::new_v4();
        store
            .replace_committed_lineup(
                Uuid::new_v4(),
                round_id,
                &[LineupEntry::starter(fielded.id)],
                Credits::ZERO,
            )
            .await
            .unwrap();
        store.save_stat_line(round_id, benched.id, &StatLine::default(), Decimal::ONE).await.unwrap();

        let err = store.delete_player(fielded.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.player(fielded.id).await.unwrap().is_some());

        store.delete_player(benched.id).await.unwrap();
        assert!(store.player(benched.id).await.unwrap().is_none());
        assert!(store.round_stat_lines(round_id).await.unwrap().is_empty());

        let err = store.delete_player(benched.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_active_round_rejected() {
        let store = InMemoryLeagueStore::new();
        let round = Round::new("Rodada 1");
        store.create_round(&round).await.unwrap();
        store.activate_round(round.id).await.unwrap();

        let err = store.delete_round(round.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.round(round.id).await.unwrap().is_some());

        store.finish_round(round.id).await.unwrap();
        store.delete_round(round.id).await.unwrap();
        assert!(store.list_rounds().await.unwrap().is_empty());
    }
}
