//! LeagueService - Futsal fantasy league market and scoring
//!
//! This crate drafts lineups under the formation and budget rules, commits
//! them against a pluggable store, runs round administration and feeds saved
//! match statistics through the shared scoring engine.

pub mod builder;
pub mod config;
pub mod credits;
pub mod draft;
pub mod error;
pub mod lineup;
pub mod player;
pub mod round;
pub mod service;
pub mod session;
pub mod standings;
pub mod stats;
pub mod storage;

pub use builder::LineupBuilder;
pub use config::{DatabaseConfig, LeagueConfig, LoggingConfig};
pub use error::{CatalogError, LeagueServiceError, LineupError, StoreError};
pub use service::LeagueService;

// Re-export commonly used types
pub use credits::Credits;
pub use draft::{Draft, DraftError, DraftSlots};
pub use lineup::{CommitReceipt, CommittedLineup, LineupCommit, LineupEntry};
pub use player::Player;
pub use round::{Round, RoundStatus, RoundStatusParseError};
pub use session::MarketSession;
pub use standings::{LineupSummary, RankingEntry, DEFAULT_RANKING_LIMIT};
pub use stats::{ScoredStatLine, StatDesk};
pub use storage::{InMemoryLeagueStore, LeagueStore, PgLeagueStore};

// Result type alias
pub type Result<T> = std::result::Result<T, LeagueServiceError>;
