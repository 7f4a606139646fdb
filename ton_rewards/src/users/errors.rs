//! User error types.

use thiserror::Error;

use crate::{
    UserId,
    db::StoreError,
    error::{DomainError, ErrorKind},
};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid username: {0}")]
    InvalidUsername(&'static str),

    #[error("Display name must be at most 100 characters")]
    InvalidDisplayName,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("User {0} not found")]
    UserNotFound(UserId),
}

impl DomainError for UserError {
    fn kind(&self) -> ErrorKind {
        match self {
            UserError::Store(e) => e.kind(),
            UserError::InvalidUsername(_) | UserError::InvalidDisplayName => {
                ErrorKind::Validation
            }
            UserError::UsernameTaken => ErrorKind::Conflict,
            UserError::UserNotFound(_) => ErrorKind::NotFound,
        }
    }

    fn client_message(&self) -> String {
        match self {
            UserError::UserNotFound(_) => "User not found".to_string(),
            // Lost the race with a concurrent registration
            UserError::Store(StoreError::Duplicate(_)) => UserError::UsernameTaken.to_string(),
            _ if self.kind() == ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type UserResult<T> = Result<T, UserError>;
