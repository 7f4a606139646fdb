use thiserror::Error;

use crate::{
    db::StoreError,
    error::{DomainError, ErrorKind},
};

/// Leaderboard errors
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError for LeaderboardError {
    fn kind(&self) -> ErrorKind {
        match self {
            LeaderboardError::Store(e) => e.kind(),
        }
    }
}

pub type LeaderboardResult<T> = Result<T, LeaderboardError>;
