//! Lineup drafting under formation and budget rules

use crate::credits::Credits;
use crate::draft::Draft;
use crate::error::{LineupError, StoreError};
use crate::lineup::LineupCommit;
use crate::player::Player;
use crate::storage::LeagueStore;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// LineupBuilder owns one user's draft for one market session.
///
/// Edits are checked against the roster, the formation (1 GOL, 1 FIX,
/// 2 ALA, 1 PIV) and the budget. A failed edit leaves the draft as it was.
#[derive(Debug, Clone)]
pub struct LineupBuilder {
    roster: HashMap<Uuid, Player>,
    draft: Draft,
    budget: Credits,
}

impl LineupBuilder {
    /// Start an empty draft over `roster` with `budget` to spend
    pub fn new(roster: impl IntoIterator<Item = Player>, budget: Credits) -> Self {
        Self {
            roster: roster.into_iter().map(|p| (p.id, p)).collect(),
            draft: Draft::new(),
            budget,
        }
    }

    /// Swap in a fresh roster and budget, keeping the current draft
    pub fn refresh(&mut self, roster: impl IntoIterator<Item = Player>, budget: Credits) {
        self.roster = roster.into_iter().map(|p| (p.id, p)).collect();
        self.budget = budget;
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Credits available to this draft, including the spend of the lineup
    /// it would replace
    pub fn budget(&self) -> Credits {
        self.budget
    }

    pub fn roster(&self) -> impl Iterator<Item = &Player> {
        self.roster.values()
    }

    pub fn current_cost(&self) -> Credits {
        self.draft.cost()
    }

    /// Budget left after paying for the current draft
    pub fn remaining(&self) -> Credits {
        self.budget - self.current_cost()
    }

    pub fn is_complete(&self) -> bool {
        self.draft.is_complete()
    }

    pub fn clear(&mut self) {
        self.draft.clear();
    }

    /// Put a roster player into the first free slot of their role
    pub fn add(&mut self, player_id: Uuid) -> Result<&Draft, LineupError> {
        let player = self.roster.get(&player_id).ok_or(LineupError::UnknownPlayer { player_id })?;

        if self.draft.contains(player_id) {
            return Err(LineupError::AlreadyInLineup { player_id });
        }
        if self.draft.occupied(player.role) >= player.role.required_count() {
            return Err(LineupError::RoleFull { role: player.role });
        }

        let required = self.draft.cost() + player.price;
        if required > self.budget {
            return Err(LineupError::BudgetExceeded { required, available: self.budget });
        }

        let player = player.clone();
        debug!(player = %player.name, role = %player.role, "Adding player to draft");
        self.draft.place(player).map_err(|p| LineupError::RoleFull { role: p.role })?;
        Ok(&self.draft)
    }

    /// Take a player out of the draft.
    ///
    /// Removing a player that is not drafted yields the soft `NotInLineup`.
    pub fn remove(&mut self, player_id: Uuid) -> Result<Player, LineupError> {
        self.draft.take(player_id).ok_or(LineupError::NotInLineup { player_id })
    }

    /// Place a previously committed player without the budget check.
    ///
    /// Returns false when the player is unknown or cannot be seated.
    pub(crate) fn restore(&mut self, player_id: Uuid) -> bool {
        match self.roster.get(&player_id) {
            Some(player) if !self.draft.contains(player_id) => {
                self.draft.place(player.clone()).is_ok()
            }
            _ => false,
        }
    }

    /// Commit the draft as the user's lineup for `round_id`.
    ///
    /// The round status is read from `store` first, so a market that closed
    /// after the draft was loaded is caught here. Returns the user's balance
    /// after the charge. The draft is left untouched whatever the outcome.
    pub async fn commit<S>(
        &mut self,
        user_id: Uuid,
        round_id: Uuid,
        store: &S,
    ) -> Result<Credits, LineupError>
    where
        S: LeagueStore + ?Sized,
    {
        let active = store.active_round().await?;
        if !active.as_ref().is_some_and(|round| round.id == round_id) {
            return Err(LineupError::MarketClosed { round_id: Some(round_id) });
        }

        if !self.draft.is_complete() {
            return Err(LineupError::IncompleteLineup { filled: self.draft.len() });
        }

        let cost = self.current_cost();
        if cost > self.budget {
            return Err(LineupError::BudgetExceeded { required: cost, available: self.budget });
        }

        let commit = LineupCommit { user_id, round_id, entries: self.draft.entries(), cost };
        let receipt = store.commit_lineup(&commit).await.map_err(|err| match err {
            StoreError::InsufficientBalance { required, available } => {
                LineupError::BudgetExceeded { required, available }
            }
            other => LineupError::Persistence(other),
        })?;

        // the committed spend is refundable on the next commit of this round
        self.budget = receipt.balance + cost;

        info!(
            user_id = %user_id,
            round_id = %round_id,
            lineup_id = %receipt.lineup_id,
            "Committed lineup for {}, balance now {}",
            cost,
            receipt.balance
        );
        Ok(receipt.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::{CommitReceipt, CommittedLineup, LineupEntry};
    use crate::round::Round;
    use crate::standings::{LineupSummary, RankingEntry};
    use crate::stats::{ScoredStatLine, StatDesk};
    use crate::storage::{InMemoryLeagueStore, StoreResult};
    use rust_decimal::Decimal;
    use scoring_engine::{Role, StatLine};

    struct Squad {
        gol: Player,
        fix: Player,
        ala1: Player,
        ala2: Player,
        piv: Player,
        spare_ala: Player,
        spare_gol: Player,
    }

    impl Squad {
        fn new() -> Self {
            let p = |name: &str, role, cents| {
                Player::new(name, "Magnus", role, Credits::from_cents(cents))
            };
            Self {
                gol: p("Guitta", Role::Gol, 800),
                fix: p("Rodrigo", Role::Fix, 700),
                ala1: p("Dyego", Role::Ala, 600),
                ala2: p("Arthur", Role::Ala, 500),
                piv: p("Ferrão", Role::Piv, 900),
                spare_ala: p("Pito", Role::Ala, 300),
                spare_gol: p("Willian", Role::Gol, 200),
            }
        }

        fn roster(&self) -> Vec<Player> {
            vec![
                self.gol.clone(),
                self.fix.clone(),
                self.ala1.clone(),
                self.ala2.clone(),
                self.piv.clone(),
                self.spare_ala.clone(),
                self.spare_gol.clone(),
            ]
        }

        fn starting_five(&self) -> [Uuid; 5] {
            [self.gol.id, self.fix.id, self.ala1.id, self.ala2.id, self.piv.id]
        }
    }

    fn full_builder(squad: &Squad, budget_cents: i64) -> LineupBuilder {
        let mut builder = LineupBuilder::new(squad.roster(), Credits::from_cents(budget_cents));
        for id in squad.starting_five() {
            builder.add(id).unwrap();
        }
        builder
    }

    async fn open_market(squad: &Squad, balance_cents: i64) -> (InMemoryLeagueStore, Uuid, Uuid) {
        let store = InMemoryLeagueStore::new();
        for player in squad.roster() {
            store.upsert_player(&player).await.unwrap();
        }
        let user_id = Uuid::new_v4();
        store.create_user(user_id, "Os Boleiros", Credits::from_cents(balance_cents)).await.unwrap();
        let round = Round::new("Rodada 1");
        store.create_round(&round).await.unwrap();
        store.activate_round(round.id).await.unwrap();
        (store, user_id, round.id)
    }

    #[test]
    fn test_add_fills_first_free_slot() {
        let squad = Squad::new();
        let mut builder = LineupBuilder::new(squad.roster(), Credits::from_cents(4000));

        let draft = builder.add(squad.ala1.id).unwrap();
        assert_eq!(draft.occupied(Role::Ala), 1);
        builder.add(squad.ala2.id).unwrap();
        assert_eq!(builder.draft().slots(Role::Ala)[1].as_ref().unwrap().id, squad.ala2.id);
        assert_eq!(builder.current_cost(), Credits::from_cents(1100));
        assert_eq!(builder.remaining(), Credits::from_cents(2900));
    }

    #[test]
    fn test_add_unknown_player() {
        let squad = Squad::new();
        let mut builder = LineupBuilder::new(squad.roster(), Credits::from_cents(4000));
        let err = builder.add(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, LineupError::UnknownPlayer { .. }));
        assert!(builder.draft().is_empty());
    }

    #[test]
    fn test_add_rejects_full_role() {
        let squad = Squad::new();
        let mut builder = LineupBuilder::new(squad.roster(), Credits::from_cents(4000));
        builder.add(squad.ala1.id).unwrap();
        builder.add(squad.ala2.id).unwrap();
        let before = builder.draft().clone();

        let err = builder.add(squad.spare_ala.id).unwrap_err();
        assert!(matches!(err, LineupError::RoleFull { role: Role::Ala }));
        assert_eq!(builder.draft(), &before);

        builder.add(squad.gol.id).unwrap();
        let err = builder.add(squad.spare_gol.id).unwrap_err();
        assert!(matches!(err, LineupError::RoleFull { role: Role::Gol }));
    }

    #[test]
    fn test_add_same_player_twice() {
        let squad = Squad::new();
        let mut builder = LineupBuilder::new(squad.roster(), Credits::from_cents(4000));
        builder.add(squad.ala1.id).unwrap();
        let err = builder.add(squad.ala1.id).unwrap_err();
        assert!(matches!(err, LineupError::AlreadyInLineup { .. }));
        assert_eq!(builder.draft().occupied(Role::Ala), 1);
    }

    #[test]
    fn test_add_over_budget_leaves_draft_unchanged() {
        let squad = Squad::new();
        let mut builder = LineupBuilder::new(squad.roster(), Credits::from_cents(1400));
        builder.add(squad.gol.id).unwrap();
        let before = builder.draft().clone();

        let err = builder.add(squad.fix.id).unwrap_err();
        match err {
            LineupError::BudgetExceeded { required, available } => {
                assert_eq!(required, Credits::from_cents(1500));
                assert_eq!(available, Credits::from_cents(1400));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(builder.draft(), &before);
    }

    #[test]
    fn test_add_exactly_at_budget() {
        let squad = Squad::new();
        let builder = full_builder(&squad, 3500);
        assert!(builder.is_complete());
        assert_eq!(builder.remaining(), Credits::ZERO);
    }

    #[test]
    fn test_remove_is_soft_when_missing() {
        let squad = Squad::new();
        let mut builder = full_builder(&squad, 4000);

        let removed = builder.remove(squad.piv.id).unwrap();
        assert_eq!(removed.id, squad.piv.id);
        assert!(!builder.is_complete());

        let err = builder.remove(squad.piv.id).unwrap_err();
        assert!(err.is_soft());
        assert_eq!(builder.draft().len(), 4);
    }

    #[test]
    fn test_clear_and_cost() {
        let squad = Squad::new();
        let mut builder = full_builder(&squad, 4000);
        assert_eq!(builder.current_cost(), Credits::from_cents(3500));
        builder.clear();
        assert!(builder.draft().is_empty());
        assert_eq!(builder.current_cost(), Credits::ZERO);
    }

    #[tokio::test]
    async fn test_commit_deducts_cost() {
        let squad = Squad::new();
        let (store, user_id, round_id) = open_market(&squad, 4000).await;
        let mut builder = full_builder(&squad, 4000);

        let balance = builder.commit(user_id, round_id, &store).await.unwrap();
        assert_eq!(balance, Credits::from_cents(500));
        assert_eq!(store.user_budget(user_id).await.unwrap(), Credits::from_cents(500));

        let lineup = store.committed_lineup(user_id, round_id).await.unwrap().unwrap();
        assert_eq!(lineup.entries.len(), 5);
        assert!(lineup.entries.iter().all(|e| e.is_starter && e.points.is_zero()));
        assert_eq!(lineup.spent, Credits::from_cents(3500));
        assert!(builder.is_complete());
    }

    #[tokio::test]
    async fn test_commit_over_budget_writes_nothing() {
        let squad = Squad::new();
        let (store, user_id, round_id) = open_market(&squad, 3000).await;
        let mut builder = full_builder(&squad, 4000);
        builder.refresh(squad.roster(), Credits::from_cents(3000));

        let err = builder.commit(user_id, round_id, &store).await.unwrap_err();
        assert!(matches!(err, LineupError::BudgetExceeded { .. }));
        assert_eq!(store.user_budget(user_id).await.unwrap(), Credits::from_cents(3000));
        assert!(store.committed_lineup(user_id, round_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_checks_stored_balance() {
        let squad = Squad::new();
        let (store, user_id, round_id) = open_market(&squad, 3000).await;
        // builder believes it has more than the account holds
        let mut builder = full_builder(&squad, 4000);

        let err = builder.commit(user_id, round_id, &store).await.unwrap_err();
        assert!(matches!(err, LineupError::BudgetExceeded { .. }));
        assert_eq!(store.user_budget(user_id).await.unwrap(), Credits::from_cents(3000));
        assert!(store.committed_lineup(user_id, round_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_incomplete() {
        let squad = Squad::new();
        let (store, user_id, round_id) = open_market(&squad, 4000).await;
        let mut builder = full_builder(&squad, 4000);
        builder.remove(squad.fix.id).unwrap();

        let err = builder.commit(user_id, round_id, &store).await.unwrap_err();
        assert!(matches!(err, LineupError::IncompleteLineup { filled: 4 }));
    }

    #[tokio::test]
    async fn test_commit_after_market_closed() {
        let squad = Squad::new();
        let (store, user_id, round_id) = open_market(&squad, 4000).await;
        let mut builder = full_builder(&squad, 4000);

        store.finish_round(round_id).await.unwrap();
        let err = builder.commit(user_id, round_id, &store).await.unwrap_err();
        assert!(matches!(err, LineupError::MarketClosed { .. }));
        assert_eq!(store.user_budget(user_id).await.unwrap(), Credits::from_cents(4000));
    }

    #[tokio::test]
    async fn test_market_closed_wins_over_incomplete_draft() {
        let squad = Squad::new();
        let (store, user_id, _) = open_market(&squad, 4000).await;
        let mut builder = LineupBuilder::new(squad.roster(), Credits::from_cents(4000));

        // targeting a round that is not the active one
        let err = builder.commit(user_id, Uuid::new_v4(), &store).await.unwrap_err();
        assert!(matches!(err, LineupError::MarketClosed { .. }));
    }

    #[tokio::test]
    async fn test_recommit_refunds_previous_spend() {
        let squad = Squad::new();
        let (store, user_id, round_id) = open_market(&squad, 4000).await;
        let mut builder = full_builder(&squad, 4000);

        assert_eq!(builder.commit(user_id, round_id, &store).await.unwrap(), Credits::from_cents(500));
        // same draft again settles to the same state
        assert_eq!(builder.commit(user_id, round_id, &store).await.unwrap(), Credits::from_cents(500));

        // swap the 6.00 winger for the 3.00 one
        builder.remove(squad.ala1.id).unwrap();
        builder.add(squad.spare_ala.id).unwrap();
        let balance = builder.commit(user_id, round_id, &store).await.unwrap();
        assert_eq!(balance, Credits::from_cents(800));

        let lineup = store.committed_lineup(user_id, round_id).await.unwrap().unwrap();
        assert!(lineup.contains(squad.spare_ala.id));
        assert!(!lineup.contains(squad.ala1.id));
        assert_eq!(lineup.spent, Credits::from_cents(3200));
    }

    /// Delegates to the in-memory store but cannot write balances, and keeps
    /// the default compensating `commit_lineup`
    struct BalanceWriteFails {
        inner: InMemoryLeagueStore,
    }

    #[async_trait::async_trait]
    impl LeagueStore for BalanceWriteFails {
        async fn create_user(
            &self,
            user_id: Uuid,
            team_name: &str,
            credits: Credits,
        ) -> StoreResult<()> {
            self.inner.create_user(user_id, team_name, credits).await
        }

        async fn user_budget(&self, user_id: Uuid) -> StoreResult<Credits> {
            self.inner.user_budget(user_id).await
        }

        async fn set_user_budget(&self, _user_id: Uuid, _budget: Credits) -> StoreResult<()> {
            Err(StoreError::Internal("balance write rejected".to_string()))
        }

        async fn active_round(&self) -> StoreResult<Option<Round>> {
            self.inner.active_round().await
        }

        async fn round(&self, round_id: Uuid) -> StoreResult<Option<Round>> {
            self.inner.round(round_id).await
        }

        async fn create_round(&self, round: &Round) -> StoreResult<()> {
            self.inner.create_round(round).await
        }

        async fn list_rounds(&self) -> StoreResult<Vec<Round>> {
            self.inner.list_rounds().await
        }

        async fn activate_round(&self, round_id: Uuid) -> StoreResult<Round> {
            self.inner.activate_round(round_id).await
        }

        async fn finish_round(&self, round_id: Uuid) -> StoreResult<Round> {
            self.inner.finish_round(round_id).await
        }

        async fn roster(&self) -> StoreResult<Vec<Player>> {
            self.inner.roster().await
        }

        async fn player(&self, player_id: Uuid) -> StoreResult<Option<Player>> {
            self.inner.player(player_id).await
        }

        async fn upsert_player(&self, player: &Player) -> StoreResult<()> {
            self.inner.upsert_player(player).await
        }

        async fn delete_player(&self, player_id: Uuid) -> StoreResult<()> {
            self.inner.delete_player(player_id).await
        }

        async fn delete_round(&self, round_id: Uuid) -> StoreResult<()> {
            self.inner.delete_round(round_id).await
        }

        async fn ranking(&self, limit: usize) -> StoreResult<Vec<RankingEntry>> {
            self.inner.ranking(limit).await
        }

        async fn user_lineups(&self, user_id: Uuid) -> StoreResult<Vec<LineupSummary>> {
            self.inner.user_lineups(user_id).await
        }

        async fn committed_lineup(
            &self,
            user_id: Uuid,
            round_id: Uuid,
        ) -> StoreResult<Option<CommittedLineup>> {
            self.inner.committed_lineup(user_id, round_id).await
        }

        async fn replace_committed_lineup(
            &self,
            user_id: Uuid,
            round_id: Uuid,
            entries: &[LineupEntry],
            spent: Credits,
        ) -> StoreResult<Uuid> {
            self.inner.replace_committed_lineup(user_id, round_id, entries, spent).await
        }

        async fn delete_committed_lineup(&self, user_id: Uuid, round_id: Uuid) -> StoreResult<()> {
            self.inner.delete_committed_lineup(user_id, round_id).await
        }

        async fn stat_line(
            &self,
            round_id: Uuid,
            player_id: Uuid,
        ) -> StoreResult<Option<StatLine>> {
            self.inner.stat_line(round_id, player_id).await
        }

        async fn save_stat_line(
            &self,
            round_id: Uuid,
            player_id: Uuid,
            stats: &StatLine,
            points: Decimal,
        ) -> StoreResult<()> {
            self.inner.save_stat_line(round_id, player_id, stats, points).await
        }

        async fn delete_stat_line(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<()> {
            self.inner.delete_stat_line(round_id, player_id).await
        }

        async fn round_stat_lines(&self, round_id: Uuid) -> StoreResult<Vec<ScoredStatLine>> {
            self.inner.round_stat_lines(round_id).await
        }

        async fn apply_player_points(
            &self,
            round_id: Uuid,
            player_id: Uuid,
            points: Decimal,
        ) -> StoreResult<u64> {
            self.inner.apply_player_points(round_id, player_id, points).await
        }
    }

    #[tokio::test]
    async fn test_failed_balance_write_restores_previous_lineup() {
        let squad = Squad::new();
        let (inner, user_id, round_id) = open_market(&squad, 4000).await;

        let first = LineupCommit {
            user_id,
            round_id,
            entries: squad.starting_five().into_iter().map(LineupEntry::starter).collect(),
            cost: Credits::from_cents(3500),
        };
        let CommitReceipt { balance, .. } = inner.commit_lineup(&first).await.unwrap();
        assert_eq!(balance, Credits::from_cents(500));

        let store = BalanceWriteFails { inner: inner.clone() };
        let mut builder = full_builder(&squad, 4000);
        builder.remove(squad.ala1.id).unwrap();
        builder.add(squad.spare_ala.id).unwrap();
        let before = builder.draft().clone();

        let err = builder.commit(user_id, round_id, &store).await.unwrap_err();
        assert!(matches!(err, LineupError::Persistence(StoreError::Internal(_))));
        assert_eq!(builder.draft(), &before);

        let lineup = inner.committed_lineup(user_id, round_id).await.unwrap().unwrap();
        assert!(lineup.contains(squad.ala1.id));
        assert!(!lineup.contains(squad.spare_ala.id));
        assert_eq!(lineup.spent, Credits::from_cents(3500));
        assert_eq!(inner.user_budget(user_id).await.unwrap(), Credits::from_cents(500));
    }

    #[tokio::test]
    async fn test_failed_first_commit_leaves_no_lineup() {
        let squad = Squad::new();
        let (inner, user_id, round_id) = open_market(&squad, 4000).await;
        let store = BalanceWriteFails { inner: inner.clone() };
        let mut builder = full_builder(&squad, 4000);

        let err = builder.commit(user_id, round_id, &store).await.unwrap_err();
        assert!(matches!(err, LineupError::Persistence(_)));
        assert!(inner.committed_lineup(user_id, round_id).await.unwrap().is_none());
        assert_eq!(inner.user_budget(user_id).await.unwrap(), Credits::from_cents(4000));
    }

    #[tokio::test]
    async fn test_default_record_and_remove_stats() {
        let squad = Squad::new();
        let (inner, user_id, round_id) = open_market(&squad, 4000).await;
        let first = LineupCommit {
            user_id,
            round_id,
            entries: squad.starting_five().into_iter().map(LineupEntry::starter).collect(),
            cost: Credits::from_cents(3500),
        };
        inner.commit_lineup(&first).await.unwrap();

        // the wrapper keeps the trait's two-step record_stats and remove_stats
        let store = BalanceWriteFails { inner: inner.clone() };
        let desk = StatDesk::new(&store);
        let points = desk
            .save(round_id, squad.piv.id, StatLine { goals: 1, ..Default::default() })
            .await
            .unwrap();

        let lineup = inner.committed_lineup(user_id, round_id).await.unwrap().unwrap();
        assert_eq!(lineup.total_points, points);
        assert_eq!(inner.ranking(1).await.unwrap()[0].total_points, points);

        assert_eq!(desk.delete(round_id, squad.piv.id).await.unwrap(), 1);
        let lineup = inner.committed_lineup(user_id, round_id).await.unwrap().unwrap();
        assert_eq!(lineup.total_points, Decimal::ZERO);
        assert!(inner.stat_line(round_id, squad.piv.id).await.unwrap().is_none());
    }
}
