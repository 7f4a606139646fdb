//! Wallet accounting over three currencies: TON token, gems and diamonds.
//!
//! This module implements:
//! - Relative-increment credits that never lose a concurrent update
//! - Conditional debits that cannot drive any balance negative
//! - Admin credits recorded as claimed `admin` bonuses
//! - TON payout address registration
//! - Transaction history and earnings rollups
//!
//! ## Example
//!
//! ```no_run
//! use ton_rewards::{clock::SystemClock, db::Database, wallet::{Funds, WalletManager}};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let wallets = WalletManager::new(Arc::new(db.ledger()), Arc::new(SystemClock));
//!
//!     let wallet = wallets.credit(1, Funds::gems(25)).await?;
//!     println!("Gems after credit: {}", wallet.gems);
//!
//!     let wallet = wallets.debit(1, Funds::gems(10)).await?;
//!     println!("Gems after debit: {}", wallet.gems);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use manager::WalletManager;
pub use models::{
    AdminCredit, Currency, DebitOutcome, EarningsSummary, Funds, FundsError, LedgerEvent,
    LedgerEventKind, MAX_TOKEN, TOKEN_SCALE, Wallet,
};
