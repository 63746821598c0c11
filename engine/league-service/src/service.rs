//! LeagueService implementation

use crate::config::LeagueConfig;
use crate::credits::Credits;
use crate::lineup::CommittedLineup;
use crate::player::Player;
use crate::round::Round;
use crate::session::MarketSession;
use crate::standings::{LineupSummary, RankingEntry};
use crate::stats::StatDesk;
use crate::storage::{LeagueStore, PgLeagueStore};
use crate::Result;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// LeagueService ties the store, configuration and admin operations together
#[derive(Clone)]
pub struct LeagueService {
    store: Arc<dyn LeagueStore>,
    config: LeagueConfig,
}

impl std::fmt::Debug for LeagueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeagueService").field("config", &self.config).finish_non_exhaustive()
    }
}

impl LeagueService {
    /// Create a new LeagueService backed by PostgreSQL
    pub async fn new(config: LeagueConfig) -> Result<Self> {
        let store = PgLeagueStore::connect(&config.database).await?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Create a LeagueService over any store
    pub fn with_store(store: Arc<dyn LeagueStore>, config: LeagueConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn LeagueStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &LeagueConfig {
        &self.config
    }

    /// Register a user with the configured starting credits
    pub async fn register_user(&self, team_name: &str) -> Result<Uuid> {
        let user_id = Uuid::new_v4();
        self.store.create_user(user_id, team_name, self.config.starting_credits).await?;
        info!(user_id = %user_id, "Registered team {} with {}", team_name, self.config.starting_credits);
        Ok(user_id)
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<Credits> {
        Ok(self.store.user_budget(user_id).await?)
    }

    /// Open the market for a user on the active round
    pub async fn open_market(&self, user_id: Uuid) -> Result<MarketSession> {
        Ok(MarketSession::open(self.store.as_ref(), user_id).await?)
    }

    /// Commit a session's draft
    pub async fn commit(&self, session: &mut MarketSession) -> Result<Credits> {
        Ok(session.commit(self.store.as_ref()).await?)
    }

    pub async fn lineup(&self, user_id: Uuid, round_id: Uuid) -> Result<Option<CommittedLineup>> {
        Ok(self.store.committed_lineup(user_id, round_id).await?)
    }

    /// League table, best total first
    pub async fn ranking(&self, limit: usize) -> Result<Vec<RankingEntry>> {
        Ok(self.store.ranking(limit).await?)
    }

    /// A user's committed lineups, newest round first
    pub async fn lineup_history(&self, user_id: Uuid) -> Result<Vec<LineupSummary>> {
        Ok(self.store.user_lineups(user_id).await?)
    }

    pub async fn active_round(&self) -> Result<Option<Round>> {
        Ok(self.store.active_round().await?)
    }

    pub async fn create_round(&self, name: &str) -> Result<Round> {
        let round = Round::new(name);
        self.store.create_round(&round).await?;
        info!(round_id = %round.id, "Created round {}", round.name);
        Ok(round)
    }

    /// Make a round the only active one, opening its market
    pub async fn activate_round(&self, round_id: Uuid) -> Result<Round> {
        let round = self.store.activate_round(round_id).await?;
        info!(round_id = %round.id, "Market open for {}", round.name);
        Ok(round)
    }

    pub async fn finish_round(&self, round_id: Uuid) -> Result<Round> {
        let round = self.store.finish_round(round_id).await?;
        info!(round_id = %round.id, "Finished {}", round.name);
        Ok(round)
    }

    pub async fn list_rounds(&self) -> Result<Vec<Round>> {
        Ok(self.store.list_rounds().await?)
    }

    /// Remove a round that is not active, with its lineups and stats
    pub async fn delete_round(&self, round_id: Uuid) -> Result<()> {
        self.store.delete_round(round_id).await?;
        info!(round_id = %round_id, "Deleted round");
        Ok(())
    }

    pub async fn players(&self) -> Result<Vec<Player>> {
        Ok(self.store.roster().await?)
    }

    /// Validate and store a catalog entry
    pub async fn save_player(&self, player: &Player) -> Result<()> {
        player.validate()?;
        self.store.upsert_player(player).await?;
        info!(player_id = %player.id, "Saved player {} ({}, {})", player.name, player.role, player.price);
        Ok(())
    }

    /// Remove a catalog entry that no committed lineup fields
    pub async fn delete_player(&self, player_id: Uuid) -> Result<()> {
        self.store.delete_player(player_id).await?;
        info!(player_id = %player_id, "Deleted player");
        Ok(())
    }

    pub fn stat_desk(&self) -> StatDesk<'_> {
        StatDesk::new(self.store.as_ref())
    }
}
