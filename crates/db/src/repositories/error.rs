//! Repository error type and its mapping into the core store errors.

use rust_decimal::Decimal;
use sea_orm::{DbErr, SqlErr};
use storeledger_core::store::StoreError;
use storeledger_core::wallet::LedgerError;
use uuid::Uuid;

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A reference is already taken by another row.
    #[error("Duplicate reference: {0}")]
    DuplicateReference(String),

    /// Wallet not found.
    #[error("Wallet not found: {0}")]
    WalletNotFound(Uuid),

    /// Ledger transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Any other row the operation depends on does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conditional hold did not match because the balance is too low.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Available balance at the time of the attempt.
        available: Decimal,
        /// Requested hold.
        requested: Decimal,
    },

    /// A stored row could not be mapped to a domain value, or a domain
    /// value could not be stored.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    pub(crate) fn corrupt(err: impl std::fmt::Display) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Returns true if `err` is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateReference(reference) => Self::Conflict(reference),
            RepositoryError::WalletNotFound(id) | RepositoryError::TransactionNotFound(id) => {
                Self::NotFound(id.to_string())
            }
            RepositoryError::NotFound(what) => Self::NotFound(what),
            RepositoryError::InsufficientFunds { .. } => Self::Conflict(err.to_string()),
            RepositoryError::Corrupt(msg) => Self::Corrupt(msg),
            RepositoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

impl From<RepositoryError> for LedgerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateReference(reference) => Self::DuplicateReference(reference),
            RepositoryError::WalletNotFound(id) => Self::WalletNotFound(id.to_string()),
            RepositoryError::TransactionNotFound(id) => Self::TransactionNotFound(id.to_string()),
            RepositoryError::InsufficientFunds {
                available,
                requested,
            } => Self::InsufficientFunds {
                available,
                requested,
            },
            other => Self::Store(other.into()),
        }
    }
}
