//! Wallet error types.

use rust_decimal::Decimal;
use thiserror::Error;

use super::models::{Currency, FundsError};
use crate::{
    UserId,
    db::StoreError,
    error::{DomainError, ErrorKind},
};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Ledger store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Negative or over-precise amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] FundsError),

    /// Admin credit without any positive amount
    #[error("At least one amount must be positive")]
    NothingToCredit,

    #[error("Reason must be between 1 and 255 characters")]
    InvalidReason,

    /// Debit exceeds the balance of `currency`
    #[error("Insufficient {currency}: available {available}, required {required}")]
    InsufficientFunds {
        currency: Currency,
        available: Decimal,
        required: Decimal,
    },

    #[error("Wallet not found for user {0}")]
    WalletNotFound(UserId),

    #[error("Invalid TON address format")]
    InvalidTonAddress,

    #[error("TON address is already in use")]
    TonAddressTaken,
}

impl DomainError for WalletError {
    fn kind(&self) -> ErrorKind {
        match self {
            WalletError::Store(e) => e.kind(),
            WalletError::InvalidAmount(_)
            | WalletError::NothingToCredit
            | WalletError::InvalidReason
            | WalletError::InvalidTonAddress => ErrorKind::Validation,
            WalletError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            WalletError::WalletNotFound(_) => ErrorKind::NotFound,
            WalletError::TonAddressTaken => ErrorKind::Conflict,
        }
    }

    fn client_message(&self) -> String {
        match self {
            // Don't expose user IDs
            WalletError::WalletNotFound(_) => "Wallet not found".to_string(),
            WalletError::Store(StoreError::Duplicate(_)) => {
                WalletError::TonAddressTaken.to_string()
            }
            _ if self.kind() == ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
