//! League table and lineup history

use crate::credits::Credits;
use crate::round::RoundStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of teams shown in the league table
pub const DEFAULT_RANKING_LIMIT: usize = 20;

/// One row of the league table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub user_id: Uuid,
    pub team_name: String,
    /// Sum of the totals of every lineup the user committed
    pub total_points: Decimal,
    pub credits: Credits,
}

/// One committed lineup as listed in a user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSummary {
    pub lineup_id: Uuid,
    pub round_id: Uuid,
    pub round_name: String,
    pub round_status: RoundStatus,
    pub total_points: Decimal,
    pub spent: Credits,
}
