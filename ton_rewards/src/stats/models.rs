//! Rollup models for the admin surface.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    game::GameSession, score::ScoreSummary, users::User, wallet::Wallet,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    /// Users with a session completed since midnight UTC
    pub active_today: i64,
    /// Users with a session completed in the trailing seven days
    pub active_week: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounts {
    pub total: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub abandoned: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTotals {
    pub total_score: i64,
    pub games_played: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTotals {
    pub ton: Decimal,
    pub gems: i64,
    pub diamonds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusCounts {
    pub total: i64,
    pub claimed: i64,
    /// Unclaimed and not expired
    pub available: i64,
}

/// Point-in-time system rollup
///
/// Each section is read independently; sums are not guaranteed to be
/// mutually consistent under concurrent writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub users: UserCounts,
    pub sessions: SessionCounts,
    pub scores: ScoreTotals,
    pub wallets: WalletTotals,
    pub bonuses: BonusCounts,
}

/// Window boundaries used by the system rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub today_start: DateTime<Utc>,
    pub week_floor: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

/// Admin view of one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOverview {
    pub user: User,
    pub wallet: Wallet,
    pub scores: ScoreSummary,
    pub recent_sessions: Vec<GameSession>,
    pub bonuses: BonusCounts,
}
