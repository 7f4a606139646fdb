//! Game session error types.

use thiserror::Error;

use super::models::{SessionStatus, UnknownGameType};
use crate::{
    SessionId, UserId,
    db::StoreError,
    error::{DomainError, ErrorKind},
    wallet::FundsError,
};

/// Game session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Ledger store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid game type: {0}")]
    InvalidGameType(#[from] UnknownGameType),

    #[error("Score must not be negative (got {0})")]
    InvalidScore(i64),

    #[error("Invalid rewards: {0}")]
    InvalidRewards(#[from] FundsError),

    /// User missing, deactivated or without a wallet
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Session missing or owned by another user
    #[error("Game session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Game session {session_id} is already {status}")]
    AlreadyFinished {
        session_id: SessionId,
        status: SessionStatus,
    },
}

impl DomainError for SessionError {
    fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Store(e) => e.kind(),
            SessionError::InvalidGameType(_)
            | SessionError::InvalidScore(_)
            | SessionError::InvalidRewards(_) => ErrorKind::Validation,
            SessionError::UserNotFound(_) | SessionError::SessionNotFound(_) => {
                ErrorKind::NotFound
            }
            SessionError::AlreadyFinished { .. } => ErrorKind::Conflict,
        }
    }

    fn client_message(&self) -> String {
        match self {
            SessionError::UserNotFound(_) => "User not found".to_string(),
            SessionError::SessionNotFound(_) => "Game session not found".to_string(),
            SessionError::AlreadyFinished { status, .. } => {
                format!("Game session is already {status}")
            }
            _ if self.kind() == ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for game session operations
pub type SessionResult<T> = Result<T, SessionError>;
