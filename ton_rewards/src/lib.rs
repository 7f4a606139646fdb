//! # TON Rewards
//!
//! Reward settlement and bonus claims for a gamified rewards application,
//! plus the leaderboards and statistics derived from them.
//!
//! Users play short games ("spin", "drop"), earn three currencies (a TON
//! token balance, gems and diamonds), accumulate scores and claim
//! time-limited bonuses. Every reward is applied exactly once even when the
//! triggering request is retried or raced by a concurrent one.
//!
//! ## Architecture
//!
//! All mutations run inside one [`db::LedgerTx`] per operation:
//!
//! - **Settlement** ([`game::GameManager::complete_session`]): lock the
//!   session, check it is still in progress, credit the wallet, update the
//!   score row, mark the session completed
//! - **Bonus claim** ([`bonus::BonusManager::claim`]): lock the bonus, check
//!   it is unclaimed and unexpired, mark it claimed, credit the wallet
//!
//! Leaderboards and stats are pure reads over the ledger, cached with short
//! TTLs.
//!
//! ## Core Modules
//!
//! - [`wallet`]: Three-currency balances with a non-negativity invariant
//! - [`game`]: Session state machine and settlement
//! - [`score`]: Per-game running totals
//! - [`bonus`]: One-shot bonus claims
//! - [`leaderboard`]: Rankings and aggregate stats
//! - [`stats`]: System rollups for the admin surface
//! - [`db`]: Ledger store trait with PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use ton_rewards::{
//!     clock::SystemClock,
//!     db::MemoryLedgerStore,
//!     users::{DEFAULT_STARTING_FUNDS, NewUser, UserManager},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryLedgerStore::new());
//!     let users = UserManager::new(store, Arc::new(SystemClock), DEFAULT_STARTING_FUNDS);
//!
//!     let (user, wallet) = users.register(NewUser::new("alice")).await.unwrap();
//!     assert_eq!(user.username, "alice");
//!     assert_eq!(wallet.gems, 100);
//! }
//! ```

/// Identifier of a user row
pub type UserId = i64;
/// Identifier of a game session row
pub type SessionId = i64;
/// Identifier of a bonus row
pub type BonusId = i64;

pub mod app_config;
pub mod bonus;
pub mod cache;
pub mod clock;
pub mod db;
pub mod error;
pub mod game;
pub mod leaderboard;
pub mod score;
pub mod stats;
pub mod users;
pub mod wallet;

pub use error::{DomainError, ErrorKind};
