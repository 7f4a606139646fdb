//! Error taxonomy shared by every domain module.
//!
//! Each module keeps its own `thiserror` enum; [`DomainError`] maps those
//! onto a small, machine-checkable [`ErrorKind`] that callers can branch on
//! without matching on module-specific variants.

use serde::{Deserialize, Serialize};

/// Machine-checkable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input, rejected before touching the ledger
    Validation,
    /// Referenced entity is absent or not owned by the caller
    NotFound,
    /// Entity is already in a terminal state
    Conflict,
    /// Bonus deadline has passed
    Expired,
    /// Debit exceeds the available balance
    InsufficientFunds,
    /// Datastore or transaction failure
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Expired => "expired",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{name}")
    }
}

/// Common surface of the per-module error enums
pub trait DomainError: std::error::Error {
    /// Failure category
    fn kind(&self) -> ErrorKind;

    /// Message that is safe to show to a client
    ///
    /// Internal failures collapse to a generic message so that SQL details
    /// and row identifiers never leave the process.
    fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientFunds).unwrap();
        assert_eq!(json, "\"insufficient_funds\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
