//! PostgreSQL league store

use super::{LeagueStore, StoreResult};
use crate::config::DatabaseConfig;
use crate::credits::Credits;
use crate::error::StoreError;
use crate::lineup::{CommitReceipt, CommittedLineup, LineupCommit, LineupEntry};
use crate::player::Player;
use crate::round::{Round, RoundStatus};
use crate::standings::{LineupSummary, RankingEntry};
use crate::stats::ScoredStatLine;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scoring_engine::{Role, StatLine};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct PlayerRow {
    id: Uuid,
    name: String,
    team: String,
    position: String,
    price: Decimal,
    photo_url: Option<String>,
    total_points: Option<Decimal>,
    average_points: Option<Decimal>,
}

impl TryFrom<PlayerRow> for Player {
    type Error = StoreError;

    fn try_from(row: PlayerRow) -> Result<Self, Self::Error> {
        let role = row
            .position
            .parse::<Role>()
            .map_err(|e| StoreError::invalid_data(format!("player {}: {}", row.id, e)))?;
        Ok(Player {
            id: row.id,
            name: row.name,
            team: row.team,
            role,
            price: Credits::new(row.price),
            photo_url: row.photo_url,
            total_points: row.total_points,
            average_points: row.average_points,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoundRow {
    id: Uuid,
    name: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RoundRow> for Round {
    type Error = StoreError;

    fn try_from(row: RoundRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RoundStatus>()
            .map_err(|e| StoreError::invalid_data(format!("round {}: {}", row.id, e)))?;
        Ok(Round { id: row.id, name: row.name, status, created_at: row.created_at })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineupRow {
    id: Uuid,
    user_id: Uuid,
    round_id: Uuid,
    total_points: Decimal,
    spent: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct RankingRow {
    id: Uuid,
    team_name: String,
    total_points: Decimal,
    credits: Decimal,
}

impl From<RankingRow> for RankingEntry {
    fn from(row: RankingRow) -> Self {
        RankingEntry {
            user_id: row.id,
            team_name: row.team_name,
            total_points: row.total_points,
            credits: Credits::new(row.credits),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    lineup_id: Uuid,
    round_id: Uuid,
    round_name: String,
    round_status: String,
    total_points: Decimal,
    spent: Decimal,
}

impl TryFrom<SummaryRow> for LineupSummary {
    type Error = StoreError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        let round_status = row
            .round_status
            .parse::<RoundStatus>()
            .map_err(|e| StoreError::invalid_data(format!("round {}: {}", row.round_id, e)))?;
        Ok(LineupSummary {
            lineup_id: row.lineup_id,
            round_id: row.round_id,
            round_name: row.round_name,
            round_status,
            total_points: row.total_points,
            spent: Credits::new(row.spent),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    player_id: Uuid,
    is_starter: bool,
    points: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct StatRow {
    round_id: Uuid,
    player_id: Uuid,
    goals: i32,
    assists: i32,
    shots_on_target: i32,
    tackles: i32,
    interceptions: i32,
    blocks: i32,
    saves: i32,
    goals_conceded: i32,
    clean_sheet: bool,
    penalty_saved: bool,
    yellow_cards: i32,
    red_cards: i32,
    fouls_committed: i32,
    fouls_suffered: i32,
    own_goals: i32,
    minutes_played: i32,
    total_points: Decimal,
}

fn counter(column: &str, value: i32) -> StoreResult<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::invalid_data(format!("negative {}: {}", column, value)))
}

fn column(name: &str, value: u32) -> StoreResult<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::invalid_data(format!("{} out of range: {}", name, value)))
}

impl TryFrom<StatRow> for ScoredStatLine {
    type Error = StoreError;

    fn try_from(row: StatRow) -> Result<Self, Self::Error> {
        let stats = StatLine {
            goals: counter("goals", row.goals)?,
            assists: counter("assists", row.assists)?,
            shots_on_target: counter("shots_on_target", row.shots_on_target)?,
            tackles: counter("tackles", row.tackles)?,
            interceptions: counter("interceptions", row.interceptions)?,
            blocks: counter("blocks", row.blocks)?,
            saves: counter("saves", row.saves)?,
            goals_conceded: counter("goals_conceded", row.goals_conceded)?,
            clean_sheet: row.clean_sheet,
            penalty_saved: row.penalty_saved,
            yellow_cards: counter("yellow_cards", row.yellow_cards)?,
            red_cards: counter("red_cards", row.red_cards)?,
            fouls_committed: counter("fouls_committed", row.fouls_committed)?,
            fouls_suffered: counter("fouls_suffered", row.fouls_suffered)?,
            own_goals: counter("own_goals", row.own_goals)?,
            minutes_played: counter("minutes_played", row.minutes_played)?,
        };
        Ok(ScoredStatLine {
            round_id: row.round_id,
            player_id: row.player_id,
            stats,
            total_points: row.total_points,
        })
    }
}

const PLAYER_COLUMNS: &str =
    "id, name, team, position, price, photo_url, total_points, average_points";
const ROUND_COLUMNS: &str = "id, name, status, created_at";
const STAT_COLUMNS: &str = "round_id, player_id, goals, assists, shots_on_target, tackles, \
     interceptions, blocks, saves, goals_conceded, clean_sheet, penalty_saved, yellow_cards, \
     red_cards, fouls_committed, fouls_suffered, own_goals, minutes_played, total_points";

/// League store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgLeagueStore {
    pool: PgPool,
}

impl PgLeagueStore {
    /// Connect and run the embedded migrations
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Connected to league database ({} max connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// Wrap an existing pool (migrations are assumed to have run)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn set_round_status(&self, round_id: Uuid, status: &str) -> StoreResult<Round> {
        let row = sqlx::query_as::<_, RoundRow>(&format!(
            "UPDATE rounds SET status = $1 WHERE id = $2 RETURNING {}",
            ROUND_COLUMNS
        ))
        .bind(status)
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("round {}", round_id)))?;
        row.try_into()
    }

    /// Upsert the lineup row, swap its player set and refresh the owner's total
    async fn write_lineup(
        conn: &mut PgConnection,
        user_id: Uuid,
        round_id: Uuid,
        entries: &[LineupEntry],
        spent: Credits,
    ) -> StoreResult<Uuid> {
        let total: Decimal = entries.iter().map(|e| e.points).sum();
        let lineup_id: Uuid = sqlx::query_scalar(
            "INSERT INTO lineups (id, user_id, round_id, total_points, spent)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, round_id) DO UPDATE SET
                 total_points = EXCLUDED.total_points,
                 spent = EXCLUDED.spent,
                 last_updated = NOW()
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(round_id)
        .bind(total)
        .bind(spent.to_decimal())
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM lineup_players WHERE lineup_id = $1")
            .bind(lineup_id)
            .execute(&mut *conn)
            .await?;

        for (slot, entry) in entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO lineup_players (lineup_id, player_id, slot, is_starter, points)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(lineup_id)
            .bind(entry.player_id)
            .bind(slot as i32)
            .bind(entry.is_starter)
            .bind(entry.points)
            .execute(&mut *conn)
            .await?;
        }

        Self::refresh_user_totals(conn, &[user_id]).await?;
        Ok(lineup_id)
    }

    /// Recompute each user's total as the sum of their lineup totals
    async fn refresh_user_totals(conn: &mut PgConnection, user_ids: &[Uuid]) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users u SET
                 total_points = COALESCE(
                     (SELECT SUM(l.total_points) FROM lineups l WHERE l.user_id = u.id), 0),
                 last_updated = NOW()
             WHERE u.id = ANY($1)",
        )
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Recompute cumulative totals and 2dp averages; NULL when no line remains
    async fn refresh_player_totals(
        conn: &mut PgConnection,
        player_ids: &[Uuid],
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE players p SET
                 total_points = (SELECT SUM(s.total_points) FROM player_stats s
                                 WHERE s.player_id = p.id),
                 average_points = (SELECT ROUND(AVG(s.total_points), 2) FROM player_stats s
                                   WHERE s.player_id = p.id)
             WHERE p.id = ANY($1)",
        )
        .bind(player_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn write_stat_line(
        conn: &mut PgConnection,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO player_stats ({})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
             ON CONFLICT (round_id, player_id) DO UPDATE SET
                 goals = EXCLUDED.goals,
                 assists = EXCLUDED.assists,
                 shots_on_target = EXCLUDED.shots_on_target,
                 tackles = EXCLUDED.tackles,
                 interceptions = EXCLUDED.interceptions,
                 blocks = EXCLUDED.blocks,
                 saves = EXCLUDED.saves,
                 goals_conceded = EXCLUDED.goals_conceded,
                 clean_sheet = EXCLUDED.clean_sheet,
                 penalty_saved = EXCLUDED.penalty_saved,
                 yellow_cards = EXCLUDED.yellow_cards,
                 red_cards = EXCLUDED.red_cards,
                 fouls_committed = EXCLUDED.fouls_committed,
                 fouls_suffered = EXCLUDED.fouls_suffered,
                 own_goals = EXCLUDED.own_goals,
                 minutes_played = EXCLUDED.minutes_played,
                 total_points = EXCLUDED.total_points,
                 last_updated = NOW()",
            STAT_COLUMNS
        ))
        .bind(round_id)
        .bind(player_id)
        .bind(column("goals", stats.goals)?)
        .bind(column("assists", stats.assists)?)
        .bind(column("shots_on_target", stats.shots_on_target)?)
        .bind(column("tackles", stats.tackles)?)
        .bind(column("interceptions", stats.interceptions)?)
        .bind(column("blocks", stats.blocks)?)
        .bind(column("saves", stats.saves)?)
        .bind(column("goals_conceded", stats.goals_conceded)?)
        .bind(stats.clean_sheet)
        .bind(stats.penalty_saved)
        .bind(column("yellow_cards", stats.yellow_cards)?)
        .bind(column("red_cards", stats.red_cards)?)
        .bind(column("fouls_committed", stats.fouls_committed)?)
        .bind(column("fouls_suffered", stats.fouls_suffered)?)
        .bind(column("own_goals", stats.own_goals)?)
        .bind(column("minutes_played", stats.minutes_played)?)
        .bind(points)
        .execute(&mut *conn)
        .await?;

        Self::refresh_player_totals(conn, &[player_id]).await
    }

    async fn remove_stat_line(
        conn: &mut PgConnection,
        round_id: Uuid,
        player_id: Uuid,
    ) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM player_stats WHERE round_id = $1 AND player_id = $2")
            .bind(round_id)
            .bind(player_id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "stat line for player {} in round {}",
                player_id, round_id
            )));
        }
        Self::refresh_player_totals(conn, &[player_id]).await
    }

    /// Set the player's points in every lineup of the round that fields them,
    /// then refresh those lineup and user totals
    async fn write_player_points(
        conn: &mut PgConnection,
        round_id: Uuid,
        player_id: Uuid,
        points: Decimal,
    ) -> StoreResult<u64> {
        sqlx::query(
            "UPDATE lineup_players lp SET points = $3
             FROM lineups l
             WHERE lp.lineup_id = l.id AND l.round_id = $1 AND lp.player_id = $2",
        )
        .bind(round_id)
        .bind(player_id)
        .bind(points)
        .execute(&mut *conn)
        .await?;

        let owners: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE lineups l SET
                 total_points = COALESCE(
                     (SELECT SUM(points) FROM lineup_players WHERE lineup_id = l.id), 0),
                 last_updated = NOW()
             WHERE l.round_id = $1
               AND EXISTS (
                   SELECT 1 FROM lineup_players lp
                   WHERE lp.lineup_id = l.id AND lp.player_id = $2)
             RETURNING l.user_id",
        )
        .bind(round_id)
        .bind(player_id)
        .fetch_all(&mut *conn)
        .await?;

        Self::refresh_user_totals(conn, &owners).await?;
        Ok(owners.len() as u64)
    }
}

#[async_trait::async_trait]
impl LeagueStore for PgLeagueStore {
    async fn create_user(
        &self,
        user_id: Uuid,
        team_name: &str,
        credits: Credits,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, team_name, credits) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(user_id)
        .bind(team_name)
        .bind(credits.to_decimal())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_budget(&self, user_id: Uuid) -> StoreResult<Credits> {
        let credits: Decimal = sqlx::query_scalar("SELECT credits FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("user {}", user_id)))?;
        Ok(Credits::new(credits))
    }

    async fn set_user_budget(&self, user_id: Uuid, budget: Credits) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE users SET credits = $1, last_updated = NOW() WHERE id = $2")
                .bind(budget.to_decimal())
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn active_round(&self) -> StoreResult<Option<Round>> {
        sqlx::query_as::<_, RoundRow>(&format!(
            "SELECT {} FROM rounds WHERE status = 'active'",
            ROUND_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?
        .map(Round::try_from)
        .transpose()
    }

    async fn round(&self, round_id: Uuid) -> StoreResult<Option<Round>> {
        sqlx::query_as::<_, RoundRow>(&format!(
            "SELECT {} FROM rounds WHERE id = $1",
            ROUND_COLUMNS
        ))
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Round::try_from)
        .transpose()
    }

    async fn create_round(&self, round: &Round) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        if round.is_market_open() {
            sqlx::query("UPDATE rounds SET status = 'upcoming' WHERE status = 'active'")
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("INSERT INTO rounds (id, name, status, created_at) VALUES ($1, $2, $3, $4)")
            .bind(round.id)
            .bind(&round.name)
            .bind(round.status.as_str())
            .bind(round.created_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_rounds(&self) -> StoreResult<Vec<Round>> {
        sqlx::query_as::<_, RoundRow>(&format!(
            "SELECT {} FROM rounds ORDER BY created_at DESC",
            ROUND_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Round::try_from)
        .collect()
    }

    async fn activate_round(&self, round_id: Uuid) -> StoreResult<Round> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE rounds SET status = 'upcoming' WHERE status = 'active' AND id <> $1")
            .bind(round_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, RoundRow>(&format!(
            "UPDATE rounds SET status = 'active' WHERE id = $1 RETURNING {}",
            ROUND_COLUMNS
        ))
        .bind(round_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("round {}", round_id)))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn finish_round(&self, round_id: Uuid) -> StoreResult<Round> {
        self.set_round_status(round_id, "finished").await
    }

    async fn roster(&self) -> StoreResult<Vec<Player>> {
        sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {} FROM players ORDER BY name",
            PLAYER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Player::try_from)
        .collect()
    }

    async fn player(&self, player_id: Uuid) -> StoreResult<Option<Player>> {
        sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {} FROM players WHERE id = $1",
            PLAYER_COLUMNS
        ))
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Player::try_from)
        .transpose()
    }

    async fn upsert_player(&self, player: &Player) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO players (id, name, team, position, price, photo_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                 name = EXCLUDED.name,
                 team = EXCLUDED.team,
                 position = EXCLUDED.position,
                 price = EXCLUDED.price,
                 photo_url = EXCLUDED.photo_url",
        )
        .bind(player.id)
        .bind(&player.name)
        .bind(&player.team)
        .bind(player.role.as_str())
        .bind(player.price.to_decimal())
        .bind(&player.photo_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_player(&self, player_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let fielded: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM lineup_players WHERE player_id = $1)",
        )
        .bind(player_id)
        .fetch_one(&mut *tx)
        .await?;
        if fielded {
            return Err(StoreError::conflict(format!(
                "player {} is fielded in a committed lineup",
                player_id
            )));
        }

        // Stat lines go with the player through the foreign key
        let result = sqlx::query("DELETE FROM players WHERE id = $1")
            .bind(player_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("player {}", player_id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_round(&self, round_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM rounds WHERE id = $1 FOR UPDATE")
                .bind(round_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::not_found(format!("round {}", round_id)))?;
        if status == RoundStatus::Active.as_str() {
            return Err(StoreError::conflict(format!("round {} is active", round_id)));
        }

        let owners: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT user_id FROM lineups WHERE round_id = $1")
                .bind(round_id)
                .fetch_all(&mut *tx)
                .await?;
        let scored: Vec<Uuid> =
            sqlx::query_scalar("SELECT player_id FROM player_stats WHERE round_id = $1")
                .bind(round_id)
                .fetch_all(&mut *tx)
                .await?;

        // Lineups, their players and the round's stat lines cascade
        sqlx::query("DELETE FROM rounds WHERE id = $1")
            .bind(round_id)
            .execute(&mut *tx)
            .await?;

        Self::refresh_user_totals(&mut *tx, &owners).await?;
        Self::refresh_player_totals(&mut *tx, &scored).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn ranking(&self, limit: usize) -> StoreResult<Vec<RankingEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, RankingRow>(
            "SELECT id, team_name, total_points, credits FROM users
             ORDER BY total_points DESC, team_name
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RankingEntry::from).collect())
    }

    async fn user_lineups(&self, user_id: Uuid) -> StoreResult<Vec<LineupSummary>> {
        sqlx::query_as::<_, SummaryRow>(
            "SELECT l.id AS lineup_id, l.round_id, r.name AS round_name,
                    r.status AS round_status, l.total_points, l.spent
             FROM lineups l
             JOIN rounds r ON r.id = l.round_id
             WHERE l.user_id = $1
             ORDER BY r.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LineupSummary::try_from)
        .collect()
    }

    async fn committed_lineup(
        &self,
        user_id: Uuid,
        round_id: Uuid,
    ) -> StoreResult<Option<CommittedLineup>> {
        let Some(row) = sqlx::query_as::<_, LineupRow>(
            "SELECT id, user_id, round_id, total_points, spent
             FROM lineups WHERE user_id = $1 AND round_id = $2",
        )
        .bind(user_id)
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let entries = sqlx::query_as::<_, EntryRow>(
            "SELECT player_id, is_starter, points FROM lineup_players
             WHERE lineup_id = $1 ORDER BY slot",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|e| LineupEntry { player_id: e.player_id, is_starter: e.is_starter, points: e.points })
        .collect();

        Ok(Some(CommittedLineup {
            id: row.id,
            user_id: row.user_id,
            round_id: row.round_id,
            entries,
            total_points: row.total_points,
            spent: Credits::new(row.spent),
        }))
    }

    async fn replace_committed_lineup(
        &self,
        user_id: Uuid,
        round_id: Uuid,
        entries: &[LineupEntry],
        spent: Credits,
    ) -> StoreResult<Uuid> {
        let mut tx = self.pool.begin().await?;
        let lineup_id = Self::write_lineup(&mut *tx, user_id, round_id, entries, spent).await?;
        tx.commit().await?;
        Ok(lineup_id)
    }

    async fn delete_committed_lineup(&self, user_id: Uuid, round_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM lineups WHERE user_id = $1 AND round_id = $2")
            .bind(user_id)
            .bind(round_id)
            .execute(&mut *tx)
            .await?;
        Self::refresh_user_totals(&mut *tx, &[user_id]).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn stat_line(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<Option<StatLine>> {
        let row = sqlx::query_as::<_, StatRow>(&format!(
            "SELECT {} FROM player_stats WHERE round_id = $1 AND player_id = $2",
            STAT_COLUMNS
        ))
        .bind(round_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| ScoredStatLine::try_from(r).map(|s| s.stats)).transpose()
    }

    async fn save_stat_line(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::write_stat_line(&mut *tx, round_id, player_id, stats, points).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_stat_line(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::remove_stat_line(&mut *tx, round_id, player_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn round_stat_lines(&self, round_id: Uuid) -> StoreResult<Vec<ScoredStatLine>> {
        sqlx::query_as::<_, StatRow>(&format!(
            "SELECT {} FROM player_stats WHERE round_id = $1 ORDER BY total_points DESC",
            STAT_COLUMNS
        ))
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ScoredStatLine::try_from)
        .collect()
    }

    async fn apply_player_points(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        points: Decimal,
    ) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let updated = Self::write_player_points(&mut *tx, round_id, player_id, points).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn record_stats(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        stats: &StatLine,
        points: Decimal,
    ) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        Self::write_stat_line(&mut *tx, round_id, player_id, stats, points).await?;
        let updated = Self::write_player_points(&mut *tx, round_id, player_id, points).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_stats(&self, round_id: Uuid, player_id: Uuid) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        Self::remove_stat_line(&mut *tx, round_id, player_id).await?;
        let updated =
            Self::write_player_points(&mut *tx, round_id, player_id, Decimal::ZERO).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn commit_lineup(&self, commit: &LineupCommit) -> StoreResult<CommitReceipt> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the user serializes racing commits from the same account
        let balance: Decimal =
            sqlx::query_scalar("SELECT credits FROM users WHERE id = $1 FOR UPDATE")
                .bind(commit.user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::not_found(format!("user {}", commit.user_id)))?;

        let previous_spent: Option<Decimal> =
            sqlx::query_scalar("SELECT spent FROM lineups WHERE user_id = $1 AND round_id = $2")
                .bind(commit.user_id)
                .bind(commit.round_id)
                .fetch_optional(&mut *tx)
                .await?;

        let new_balance = commit.settle(
            Credits::new(balance),
            previous_spent.map(Credits::new).unwrap_or(Credits::ZERO),
        )?;

        let lineup_id = Self::write_lineup(
            &mut *tx,
            commit.user_id,
            commit.round_id,
            &commit.entries,
            commit.cost,
        )
        .await?;

        sqlx::query("UPDATE users SET credits = $1, last_updated = NOW() WHERE id = $2")
            .bind(new_balance.to_decimal())
            .bind(commit.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CommitReceipt { lineup_id, balance: new_balance })
    }
}
