//! Game sessions and reward settlement.
//!
//! A session is opened in `in_progress` and ends exactly once, either
//! `completed` (with a score and reward bundle) or `abandoned`. Completion
//! is the settlement point: the wallet credit, the score update and the
//! status change commit together or not at all.
//!
//! ## Example
//!
//! ```no_run
//! use ton_rewards::{clock::SystemClock, db::Database, game::{GameManager, GameType}, wallet::Funds};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let games = GameManager::new(Arc::new(db.ledger()), Arc::new(SystemClock));
//!
//!     let started = games.start_session(1, GameType::Spin, serde_json::json!({})).await?;
//!     let settled = games
//!         .complete_session(1, started.session_id, 150, Funds::gems(10), Some(true))
//!         .await?;
//!     println!("Total spin score: {}", settled.total_score);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod manager;
pub mod models;
pub mod state_machine;

pub use config::{Difficulty, GameConfig, GameRules, PrizeTable};
pub use errors::{SessionError, SessionResult};
pub use manager::GameManager;
pub use models::{
    GameSession, GameType, NewSession, SessionQuery, SessionSettlement, SessionStarted,
    SessionStatus, UnknownGameType,
};
