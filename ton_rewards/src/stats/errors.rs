use thiserror::Error;

use crate::{
    UserId,
    db::StoreError,
    error::{DomainError, ErrorKind},
};

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("User {0} has no wallet")]
    WalletNotFound(UserId),
}

impl DomainError for StatsError {
    fn kind(&self) -> ErrorKind {
        match self {
            StatsError::Store(e) => e.kind(),
            StatsError::UserNotFound(_) | StatsError::WalletNotFound(_) => ErrorKind::NotFound,
        }
    }

    fn client_message(&self) -> String {
        match self {
            StatsError::UserNotFound(_) => "User not found".to_string(),
            StatsError::WalletNotFound(_) => "Wallet not found".to_string(),
            StatsError::Store(_) => "Internal server error".to_string(),
        }
    }
}

pub type StatsResult<T> = Result<T, StatsError>;
