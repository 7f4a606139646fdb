//! Per-(user, game type) running score totals.
//!
//! Rows are created lazily by [`ensure_score_row`] on the first completed
//! session and updated only through [`ScoreUpdate::apply`]. `total_score`
//! and `games_played` never decrease.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ScoreError, ScoreResult};
pub use manager::{ScoreManager, ensure_score_row};
pub use models::{Score, ScoreStats, ScoreSummary, ScoreUpdate};

pub(crate) use manager::record_in;
pub(crate) use models::{percentage, round2};
