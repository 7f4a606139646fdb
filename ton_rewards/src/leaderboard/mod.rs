//! Leaderboards derived from the score ledger.
//!
//! Rankings, user positions, per-game aggregates and cross-game top
//! players are pure reads over score rows. Results are cached with a short
//! TTL and may lag recent settlements by up to that TTL.

pub mod errors;
pub mod manager;
pub mod models;
pub mod ranking;

pub use errors::{LeaderboardError, LeaderboardResult};
pub use manager::{LeaderboardConfig, LeaderboardManager};
pub use models::{
    CandidateFilter, GameTypeStats, GlobalStats, LeaderboardEntry, LeaderboardPage, MAX_LIMIT,
    MAX_TOP_PLAYERS, Period, PlayerTotals, ScoreWithUser, StatsTotals, TopPlayer, UserPosition,
};
