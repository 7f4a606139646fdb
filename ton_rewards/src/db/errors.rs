//! Ledger store error types.

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors raised by a [`LedgerStore`](super::LedgerStore) backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A unique constraint rejected the write
    #[error("Duplicate {0}")]
    Duplicate(&'static str),

    /// A balance would exceed its column range
    #[error("Balance overflow")]
    Overflow,

    /// A stored value could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The transaction was already committed
    #[error("Transaction already closed")]
    TransactionClosed,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Duplicate(_) => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }

    /// Map unique violations and numeric overflow to their own variants
    pub(crate) fn from_write(err: sqlx::Error, what: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(what)
            }
            // 22003: numeric_value_out_of_range
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("22003") => {
                StoreError::Overflow
            }
            _ => StoreError::Database(err),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
