//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Errors that can occur during wallet ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount must be positive and a whole number of minor units.
    #[error("Amount must be a positive whole number of minor units, got {0}")]
    InvalidAmount(Decimal),

    /// A transaction with this reference already exists.
    #[error("Duplicate transaction reference: {0}")]
    DuplicateReference(String),

    /// Not enough available balance to place a hold.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Available balance at the time of the check.
        available: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Wallet not found.
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Ledger transaction not found.
    #[error("Ledger transaction not found: {0}")]
    TransactionNotFound(String),

    /// Payment gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::WalletNotFound(_) => "WALLET_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::Gateway(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) => 400,
            Self::WalletNotFound(_) | Self::TransactionNotFound(_) => 404,
            Self::InsufficientFunds { .. } => 422,
            // A colliding reference is a server bug; the caller retries with a new one.
            Self::DuplicateReference(_) => 500,
            Self::Gateway(e) => e.http_status_code(),
            Self::Store(e) => e.http_status_code(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DuplicateReference(_) => true,
            Self::Gateway(e) => e.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
