//! Error types for the league service

use crate::credits::Credits;
use scoring_engine::Role;
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by a `LeagueStore` backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Credits, available: Credits },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Failures of draft editing and lineup commits
#[derive(Error, Debug)]
pub enum LineupError {
    #[error("Unknown player: {player_id}")]
    UnknownPlayer { player_id: Uuid },

    #[error("All {role} slots are already filled")]
    RoleFull { role: Role },

    #[error("Player {player_id} is already in the lineup")]
    AlreadyInLineup { player_id: Uuid },

    #[error("Budget exceeded: required {required}, available {available}")]
    BudgetExceeded { required: Credits, available: Credits },

    #[error("Incomplete lineup: {filled} of 5 slots filled (1 GOL, 1 FIX, 2 ALA, 1 PIV)")]
    IncompleteLineup { filled: usize },

    #[error("Market is closed")]
    MarketClosed { round_id: Option<Uuid> },

    #[error("Player {player_id} is not in the lineup")]
    NotInLineup { player_id: Uuid },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl LineupError {
    /// Soft signals the caller may treat as a no-op rather than a failure
    pub fn is_soft(&self) -> bool {
        matches!(self, LineupError::NotInLineup { .. })
    }
}

/// Player catalog validation failures
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Price {price} outside allowed range {min} to {max}")]
    InvalidPrice { price: Credits, min: Credits, max: Credits },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum LeagueServiceError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lineup(#[from] LineupError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
