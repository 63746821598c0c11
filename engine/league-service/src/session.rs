//! Market session hydration for the active round

use crate::builder::LineupBuilder;
use crate::credits::Credits;
use crate::error::LineupError;
use crate::round::Round;
use crate::storage::LeagueStore;
use tracing::{info, warn};
use uuid::Uuid;

/// One user's view of the open market: the active round and a builder
/// loaded with whatever they already committed for it
#[derive(Debug, Clone)]
pub struct MarketSession {
    user_id: Uuid,
    round: Round,
    balance: Credits,
    builder: LineupBuilder,
}

impl MarketSession {
    /// Load the active round, the roster and the user's committed lineup.
    ///
    /// Fails with `MarketClosed` when no round is active.
    pub async fn open<S>(store: &S, user_id: Uuid) -> Result<Self, LineupError>
    where
        S: LeagueStore + ?Sized,
    {
        let round =
            store.active_round().await?.ok_or(LineupError::MarketClosed { round_id: None })?;

        let roster = store.roster().await?;
        let balance = store.user_budget(user_id).await?;
        let committed = store.committed_lineup(user_id, round.id).await?;

        let spent = committed.as_ref().map(|l| l.spent).unwrap_or(Credits::ZERO);
        let mut builder = LineupBuilder::new(roster, balance + spent);

        if let Some(lineup) = &committed {
            for entry in &lineup.entries {
                if !builder.restore(entry.player_id) {
                    warn!(
                        user_id = %user_id,
                        round_id = %round.id,
                        player_id = %entry.player_id,
                        "Skipping committed player missing from roster"
                    );
                }
            }
        }

        info!(
            user_id = %user_id,
            round = %round.name,
            "Opened market session with {} drafted players",
            builder.draft().len()
        );

        Ok(Self { user_id, round, balance, builder })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    /// Account balance at the last load or commit
    pub fn balance(&self) -> Credits {
        self.balance
    }

    pub fn builder(&self) -> &LineupBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut LineupBuilder {
        &mut self.builder
    }

    /// Commit the draft for this session's round
    pub async fn commit<S>(&mut self, store: &S) -> Result<Credits, LineupError>
    where
        S: LeagueStore + ?Sized,
    {
        let balance = self.builder.commit(self.user_id, self.round.id, store).await?;
        self.balance = balance;
        Ok(balance)
    }
}
