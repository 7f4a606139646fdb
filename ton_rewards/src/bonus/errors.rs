//! Bonus error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    BonusId, UserId,
    db::StoreError,
    error::{DomainError, ErrorKind},
    wallet::FundsError,
};

#[derive(Debug, Error)]
pub enum BonusError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Bonus missing or owned by another user
    #[error("Bonus {0} not found")]
    BonusNotFound(BonusId),

    #[error("Bonus already claimed")]
    AlreadyClaimed(BonusId),

    #[error("Bonus has expired")]
    Expired {
        bonus_id: BonusId,
        expired_at: DateTime<Utc>,
    },

    #[error("Wallet not found for user {0}")]
    WalletNotFound(UserId),

    #[error("Title must be between 1 and 255 characters")]
    InvalidTitle,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] FundsError),

    #[error("Expiry must be in the future")]
    ExpiryInPast,

    #[error("No recipients selected")]
    NoRecipients,

    #[error("Unknown users: {0:?}")]
    UnknownUsers(Vec<UserId>),
}

impl DomainError for BonusError {
    fn kind(&self) -> ErrorKind {
        match self {
            BonusError::Store(e) => e.kind(),
            BonusError::BonusNotFound(_) | BonusError::WalletNotFound(_) => ErrorKind::NotFound,
            BonusError::AlreadyClaimed(_) => ErrorKind::Conflict,
            BonusError::Expired { .. } => ErrorKind::Expired,
            BonusError::InvalidTitle
            | BonusError::InvalidAmount(_)
            | BonusError::ExpiryInPast
            | BonusError::NoRecipients
            | BonusError::UnknownUsers(_) => ErrorKind::Validation,
        }
    }

    fn client_message(&self) -> String {
        match self {
            BonusError::BonusNotFound(_) => "Bonus not found".to_string(),
            BonusError::WalletNotFound(_) => "Wallet not found".to_string(),
            _ if self.kind() == ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type BonusResult<T> = Result<T, BonusError>;
