//! Game session manager: session lifecycle and reward settlement.

use std::sync::Arc;

use super::{
    config::GameConfig,
    errors::{SessionError, SessionResult},
    models::{
        GameSession, GameType, NewSession, SessionQuery, SessionSettlement, SessionStarted,
        SessionStatus,
    },
};
use crate::{
    SessionId, UserId,
    clock::Clock,
    db::{LedgerStore, LedgerTx},
    leaderboard::ranking,
    score::{ScoreUpdate, record_in},
    wallet::Funds,
};

/// Maximum number of sessions returned by `recent_sessions`
const MAX_RECENT_SESSIONS: i64 = 100;

/// Game session manager
#[derive(Clone)]
pub struct GameManager {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl GameManager {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Lock a session owned by `user_id`
    ///
    /// Sessions of other users are reported as missing.
    async fn lock_owned(
        tx: &mut dyn LedgerTx,
        user_id: UserId,
        session_id: SessionId,
    ) -> SessionResult<GameSession> {
        tx.lock_session(session_id)
            .await?
            .filter(|session| session.user_id == user_id)
            .ok_or(SessionError::SessionNotFound(session_id))
    }

    /// Open a new session
    ///
    /// # Arguments
    ///
    /// * `user_id` - Player
    /// * `game_type` - Game being played
    /// * `game_data` - Opaque client payload stored with the session
    ///
    /// # Errors
    ///
    /// * `SessionError::UserNotFound` - User missing, deactivated or without a wallet
    pub async fn start_session(
        &self,
        user_id: UserId,
        game_type: GameType,
        game_data: serde_json::Value,
    ) -> SessionResult<SessionStarted> {
        let user = self.store.find_user(user_id).await?;
        if !user.is_some_and(|u| u.is_active) || self.store.wallet(user_id).await?.is_none() {
            return Err(SessionError::UserNotFound(user_id));
        }

        let game_data = if game_data.is_null() {
            serde_json::json!({})
        } else {
            game_data
        };

        let mut tx = self.store.begin().await?;
        let session = tx
            .insert_session(
                &NewSession {
                    user_id,
                    game_type,
                    game_data,
                },
                self.clock.now(),
            )
            .await?;
        tx.commit().await?;

        log::debug!("Started {} session {} for user {}", game_type, session.id, user_id);

        Ok(SessionStarted {
            session_id: session.id,
            game_type: session.game_type,
            started_at: session.started_at,
        })
    }

    /// Settle a finished session
    ///
    /// Locks the session, credits the wallet by relative increment, updates
    /// the score row and marks the session completed, all in one
    /// transaction. A retry of an already settled session fails with
    /// `AlreadyFinished` and credits nothing.
    ///
    /// # Errors
    ///
    /// * `SessionError::InvalidScore` / `InvalidRewards` - Rejected before any write
    /// * `SessionError::SessionNotFound` - Missing or owned by another user
    /// * `SessionError::AlreadyFinished` - Session is completed or abandoned
    pub async fn complete_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        score: i64,
        rewards: Funds,
        is_win: Option<bool>,
    ) -> SessionResult<SessionSettlement> {
        if score < 0 {
            return Err(SessionError::InvalidScore(score));
        }
        rewards.validate()?;

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut session = Self::lock_owned(tx.as_mut(), user_id, session_id).await?;
        session.complete(score, &rewards, now)?;

        let wallet = tx
            .credit_wallet(user_id, &rewards, now)
            .await?
            .ok_or(SessionError::UserNotFound(user_id))?;

        let score_row = record_in(
            tx.as_mut(),
            user_id,
            session.game_type,
            ScoreUpdate { score, is_win },
            now,
        )
        .await?;

        if !tx.finish_session(&session).await? {
            return Err(SessionError::AlreadyFinished {
                session_id,
                status: SessionStatus::Completed,
            });
        }

        tx.commit().await?;

        log::info!(
            "Settled {} session {} for user {}: score={} ton={} gems={} diamonds={}",
            session.game_type,
            session_id,
            user_id,
            score,
            rewards.token,
            rewards.gems,
            rewards.diamonds
        );

        Ok(SessionSettlement {
            session_id,
            game_type: session.game_type,
            score,
            rewards,
            wallet,
            total_score: score_row.total_score,
            completed_at: now,
        })
    }

    /// Abandon an in-progress session without rewards
    pub async fn abandon_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> SessionResult<GameSession> {
        let mut tx = self.store.begin().await?;

        let mut session = Self::lock_owned(tx.as_mut(), user_id, session_id).await?;
        session.abandon(self.clock.now())?;

        if !tx.finish_session(&session).await? {
            return Err(SessionError::AlreadyFinished {
                session_id,
                status: SessionStatus::Abandoned,
            });
        }
        tx.commit().await?;

        log::debug!("User {} abandoned session {}", user_id, session_id);
        Ok(session)
    }

    /// Completed sessions of a user, newest first
    pub async fn recent_sessions(
        &self,
        user_id: UserId,
        game_type: Option<GameType>,
        limit: i64,
    ) -> SessionResult<Vec<GameSession>> {
        let sessions = self
            .store
            .completed_sessions(&SessionQuery {
                user_id,
                game_type,
                limit: Some(ranking::clamp_limit(limit, MAX_RECENT_SESSIONS)),
                ..SessionQuery::default()
            })
            .await?;
        Ok(sessions)
    }

    pub fn game_config(&self, game_type: GameType) -> GameConfig {
        GameConfig::for_game(game_type)
    }
}
