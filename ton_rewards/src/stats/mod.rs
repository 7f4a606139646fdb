//! System rollups and per-user admin overviews.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{StatsError, StatsResult};
pub use manager::{DEFAULT_STATS_TTL, StatsManager};
pub use models::{
    BonusCounts, ScoreTotals, SessionCounts, StatsWindow, SystemStats, UserCounts, UserOverview,
    WalletTotals,
};
