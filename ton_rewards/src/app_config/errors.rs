use thiserror::Error;

use crate::error::{DomainError, ErrorKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    #[error("payoutDay must be a weekday name, got '{0}'")]
    InvalidPayoutDay(String),

    #[error("Stored configuration is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl DomainError for ConfigError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::OutOfRange { .. } | ConfigError::InvalidPayoutDay(_) => {
                ErrorKind::Validation
            }
            ConfigError::Corrupt(_) => ErrorKind::Internal,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
