//! Scoring Engine
//!
//! Maps a player's role and one round of raw performance counters to a
//! fantasy point value. The admin preview and the authoritative scoring that
//! runs after statistics are saved both call into this crate, so there is a
//! single copy of the formula.

pub mod calculator;
pub mod models;

pub use calculator::{display_points, PointsBreakdown, ScoreCalculator};
pub use models::*;
