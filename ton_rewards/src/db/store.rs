//! Ledger store abstraction.
//!
//! [`LedgerStore`] serves point-in-time reads and opens [`LedgerTx`]
//! transactions for every mutation. A transaction that is dropped without
//! [`LedgerTx::commit`] rolls back, so managers can bail out with `?` at any
//! step of a composite operation and leave the ledger untouched.
//!
//! Row-level methods named `lock_*` take an exclusive lock on the row for
//! the rest of the transaction. Methods returning `bool` are check-and-set
//! writes: `false` means the guarded state had already changed and nothing
//! was written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::StoreResult;
use crate::{
    BonusId, SessionId, UserId,
    bonus::{Bonus, BonusFilter, NewBonus},
    game::{GameSession, GameType, NewSession, SessionQuery},
    leaderboard::{CandidateFilter, GameTypeStats, PlayerTotals, ScoreWithUser},
    score::Score,
    stats::{StatsWindow, SystemStats},
    users::{NewUser, User},
    wallet::{DebitOutcome, Funds, Wallet},
};

/// Durable ledger of users, wallets, scores, sessions and bonuses
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;

    async fn health_check(&self) -> StoreResult<()>;

    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    async fn wallet(&self, user_id: UserId) -> StoreResult<Option<Wallet>>;

    /// Score rows of a user, ordered by game type
    async fn scores(&self, user_id: UserId, game_type: Option<GameType>)
    -> StoreResult<Vec<Score>>;

    /// Completed sessions, newest completion first
    async fn completed_sessions(&self, query: &SessionQuery) -> StoreResult<Vec<GameSession>>;

    async fn bonuses(&self, filter: &BonusFilter, limit: i64, offset: i64)
    -> StoreResult<Vec<Bonus>>;

    async fn count_bonuses(&self, filter: &BonusFilter) -> StoreResult<i64>;

    /// Ranked slice of the candidate set
    ///
    /// Ordered by `total_score` descending, then `user_id` ascending.
    async fn leaderboard_window(
        &self,
        filter: &CandidateFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ScoreWithUser>>;

    /// Number of candidates, optionally only those with `total_score > above`
    async fn count_candidates(&self, filter: &CandidateFilter, above: Option<i64>)
    -> StoreResult<i64>;

    /// Per-game aggregates over score rows played since `since`
    async fn global_score_stats(
        &self,
        game_type: Option<GameType>,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<GameTypeStats>>;

    /// Users ranked by summed `total_score`, highest first, ties by user id
    async fn player_totals(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> StoreResult<Vec<PlayerTotals>>;

    async fn system_stats(&self, window: &StatsWindow) -> StoreResult<SystemStats>;
}

/// One ledger transaction
///
/// Dropping the value without calling [`commit`](LedgerTx::commit) discards
/// every write made through it.
#[async_trait]
pub trait LedgerTx: Send {
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;

    async fn insert_user(&mut self, user: &NewUser, now: DateTime<Utc>) -> StoreResult<User>;

    async fn insert_wallet(
        &mut self,
        user_id: UserId,
        seed: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<Wallet>;

    /// Returns the updated user, `None` if absent
    async fn set_user_active(&mut self, user_id: UserId, active: bool)
    -> StoreResult<Option<User>>;

    async fn active_user_ids(&mut self) -> StoreResult<Vec<UserId>>;

    /// Subset of `ids` that exist
    async fn existing_user_ids(&mut self, ids: &[UserId]) -> StoreResult<Vec<UserId>>;

    /// Add `funds` to the wallet as a relative increment
    async fn credit_wallet(
        &mut self,
        user_id: UserId,
        funds: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Wallet>>;

    /// Subtract `funds` only if every balance covers it
    async fn debit_wallet(
        &mut self,
        user_id: UserId,
        funds: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<DebitOutcome>;

    async fn wallet_owner_by_address(&mut self, address: &str) -> StoreResult<Option<UserId>>;

    async fn set_ton_address(
        &mut self,
        user_id: UserId,
        address: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Wallet>>;

    async fn insert_session(
        &mut self,
        session: &NewSession,
        now: DateTime<Utc>,
    ) -> StoreResult<GameSession>;

    async fn lock_session(&mut self, session_id: SessionId) -> StoreResult<Option<GameSession>>;

    /// Persist a terminal session if it is still `in_progress` in the store
    async fn finish_session(&mut self, session: &GameSession) -> StoreResult<bool>;

    /// Insert a zeroed score row if absent, then lock and return it
    async fn ensure_score(
        &mut self,
        user_id: UserId,
        game_type: GameType,
        now: DateTime<Utc>,
    ) -> StoreResult<Score>;

    async fn lock_score(&mut self, user_id: UserId, game_type: GameType)
    -> StoreResult<Option<Score>>;

    async fn save_score(&mut self, score: &Score) -> StoreResult<()>;

    /// Insert a bonus row, already claimed when `claimed_at` is set
    async fn insert_bonus(
        &mut self,
        user_id: UserId,
        bonus: &NewBonus,
        claimed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<Bonus>;

    async fn lock_bonus(&mut self, bonus_id: BonusId) -> StoreResult<Option<Bonus>>;

    /// Flip `is_claimed` if it is still false
    async fn mark_bonus_claimed(&mut self, bonus_id: BonusId, now: DateTime<Utc>)
    -> StoreResult<bool>;

    async fn commit(&mut self) -> StoreResult<()>;
}
