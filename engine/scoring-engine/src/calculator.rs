use crate::models::{Role, StatLine};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Point contribution of every scoring term for one stat line.
///
/// Penalties are stored as negative values, so `total()` is a plain sum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub goals: Decimal,
    pub assists: Decimal,
    pub shots_on_target: Decimal,
    pub tackles: Decimal,
    pub interceptions: Decimal,
    pub blocks: Decimal,
    pub saves: Decimal,
    pub clean_sheet: Decimal,
    pub penalty_saved: Decimal,
    pub fouls_suffered: Decimal,
    pub own_goals: Decimal,
    pub goals_conceded: Decimal,
    pub yellow_cards: Decimal,
    pub red_cards: Decimal,
    pub fouls_committed: Decimal,
}

impl PointsBreakdown {
    pub fn total(&self) -> Decimal {
        self.terms().iter().map(|(_, value)| *value).sum()
    }

    /// Labelled terms in display order
    pub fn terms(&self) -> [(&'static str, Decimal); 15] {
        [
            ("goals", self.goals),
            ("assists", self.assists),
            ("shots_on_target", self.shots_on_target),
            ("tackles", self.tackles),
            ("interceptions", self.interceptions),
            ("blocks", self.blocks),
            ("saves", self.saves),
            ("clean_sheet", self.clean_sheet),
            ("penalty_saved", self.penalty_saved),
            ("fouls_suffered", self.fouls_suffered),
            ("own_goals", self.own_goals),
            ("goals_conceded", self.goals_conceded),
            ("yellow_cards", self.yellow_cards),
            ("red_cards", self.red_cards),
            ("fouls_committed", self.fouls_committed),
        ]
    }
}

/// Fantasy point calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Fantasy points for one player's round. Not clamped; negative totals are valid.
    pub fn compute_points(&self, role: Role, stats: &StatLine) -> Decimal {
        self.breakdown(role, stats).total()
    }

    /// Per-term contributions behind `compute_points`
    pub fn breakdown(&self, role: Role, stats: &StatLine) -> PointsBreakdown {
        let half = Decimal::new(5, 1);
        let one_and_half = Decimal::new(15, 1);

        let goal_value = match role {
            Role::Gol => 12,
            Role::Fix => 10,
            Role::Ala | Role::Piv => 8,
        };
        let clean_sheet_bonus = match role {
            Role::Gol => 8,
            Role::Fix => 5,
            Role::Ala | Role::Piv => 3,
        };

        PointsBreakdown {
            goals: count(stats.goals) * Decimal::from(goal_value),
            assists: count(stats.assists) * Decimal::from(5),
            shots_on_target: count(stats.shots_on_target) * one_and_half,
            tackles: count(stats.tackles) * Decimal::from(2),
            interceptions: count(stats.interceptions) * Decimal::from(2),
            blocks: count(stats.blocks) * Decimal::from(2),
            saves: if role == Role::Gol {
                count(stats.saves) * one_and_half
            } else {
                Decimal::ZERO
            },
            clean_sheet: if stats.clean_sheet {
                Decimal::from(clean_sheet_bonus)
            } else {
                Decimal::ZERO
            },
            penalty_saved: if stats.penalty_saved { Decimal::from(10) } else { Decimal::ZERO },
            fouls_suffered: count(stats.fouls_suffered) * half,
            own_goals: -(count(stats.own_goals) * Decimal::from(5)),
            goals_conceded: if matches!(role, Role::Gol | Role::Fix) {
                -(count(stats.goals_conceded) * Decimal::from(2))
            } else {
                Decimal::ZERO
            },
            yellow_cards: -(count(stats.yellow_cards) * Decimal::from(2)),
            red_cards: -(count(stats.red_cards) * Decimal::from(5)),
            fouls_committed: -(count(stats.fouls_committed) * half),
        }
    }
}

fn count(value: u32) -> Decimal {
    Decimal::from(value)
}

/// Two-decimal rendering of a point total, e.g. `23.00` or `-4.50`
pub fn display_points(points: Decimal) -> String {
    let mut rounded = points.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}
