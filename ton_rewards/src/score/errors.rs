//! Score error types.

use thiserror::Error;

use crate::{
    UserId,
    db::StoreError,
    error::{DomainError, ErrorKind},
    game::GameType,
};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No {game_type} score for user {user_id}")]
    ScoreNotFound { user_id: UserId, game_type: GameType },

    #[error("Achievement name must be between 1 and 100 characters")]
    InvalidAchievement,
}

impl DomainError for ScoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            ScoreError::Store(e) => e.kind(),
            ScoreError::ScoreNotFound { .. } => ErrorKind::NotFound,
            ScoreError::InvalidAchievement => ErrorKind::Validation,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ScoreError::ScoreNotFound { game_type, .. } => format!("No {game_type} score found"),
            _ if self.kind() == ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type ScoreResult<T> = Result<T, ScoreError>;
