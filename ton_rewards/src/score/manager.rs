//! Score accumulator.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{
    errors::{ScoreError, ScoreResult},
    models::{Score, ScoreSummary, ScoreUpdate},
};
use crate::{
    UserId,
    clock::Clock,
    db::{LedgerStore, LedgerTx, StoreResult},
    game::GameType,
};

const MAX_ACHIEVEMENT_LEN: usize = 100;

/// Fetch the (user, game type) row for update, creating it zeroed if absent
pub async fn ensure_score_row(
    tx: &mut dyn LedgerTx,
    user_id: UserId,
    game_type: GameType,
    now: DateTime<Utc>,
) -> StoreResult<Score> {
    tx.ensure_score(user_id, game_type, now).await
}

/// Apply one session to the running totals inside an open transaction
pub(crate) async fn record_in(
    tx: &mut dyn LedgerTx,
    user_id: UserId,
    game_type: GameType,
    update: ScoreUpdate,
    now: DateTime<Utc>,
) -> StoreResult<Score> {
    let mut row = ensure_score_row(tx, user_id, game_type, now).await?;
    update.apply(&mut row, now);
    tx.save_score(&row).await?;
    Ok(row)
}

/// Score manager
#[derive(Clone)]
pub struct ScoreManager {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl ScoreManager {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Per-game stats of a user, optionally for one game type
    ///
    /// A user who never completed a session gets an empty summary.
    pub async fn score_stats(
        &self,
        user_id: UserId,
        game_type: Option<GameType>,
    ) -> ScoreResult<ScoreSummary> {
        let scores = self.store.scores(user_id, game_type).await?;
        Ok(ScoreSummary::from_scores(&scores))
    }

    /// Add a named achievement to a score row
    ///
    /// Adding an achievement the row already has is a no-op.
    ///
    /// # Errors
    ///
    /// * `ScoreError::InvalidAchievement` - Empty or overlong name
    /// * `ScoreError::ScoreNotFound` - User has not played this game yet
    pub async fn add_achievement(
        &self,
        user_id: UserId,
        game_type: GameType,
        name: &str,
    ) -> ScoreResult<Score> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_ACHIEVEMENT_LEN {
            return Err(ScoreError::InvalidAchievement);
        }

        let mut tx = self.store.begin().await?;
        let mut row = tx
            .lock_score(user_id, game_type)
            .await?
            .ok_or(ScoreError::ScoreNotFound { user_id, game_type })?;

        if row.add_achievement(name) {
            row.updated_at = self.clock.now();
            tx.save_score(&row).await?;
            tx.commit().await?;
            log::info!("User {} earned achievement '{}' in {}", user_id, name, game_type);
        }

        Ok(row)
    }
}
