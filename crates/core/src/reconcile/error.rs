//! Reconciliation error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::reference::ReferenceError;
use crate::store::StoreError;
use crate::wallet::LedgerError;

/// Errors that can occur while reconciling a notification.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reference could not be parsed. No lookup was attempted.
    #[error(transparent)]
    MalformedReference(#[from] ReferenceError),

    /// No sale or ledger transaction carries this reference.
    #[error("No sale or transaction for reference {0}")]
    SaleNotFound(String),

    /// Asserted amount is missing or differs from the stored total.
    #[error("Amount mismatch for {reference}: expected {expected}, got {actual:?}")]
    AmountMismatch {
        /// Reference processed.
        reference: String,
        /// Stored total.
        expected: Decimal,
        /// Asserted amount.
        actual: Option<Decimal>,
    },

    /// Asserted currency differs from the stored currency.
    #[error("Currency mismatch for {reference}: expected {expected}, got {actual}")]
    CurrencyMismatch {
        /// Reference processed.
        reference: String,
        /// Stored currency.
        expected: String,
        /// Asserted currency.
        actual: String,
    },

    /// The gateway's record belongs to another reference.
    #[error("Gateway transaction belongs to {actual}, not {expected}")]
    ReferenceMismatch {
        /// Reference supplied by the caller.
        expected: String,
        /// Reference recorded by the gateway.
        actual: String,
    },

    /// The outcome does not apply to this kind of target.
    #[error("Outcome {outcome} does not apply to {reference}")]
    UnsupportedOutcome {
        /// Reference processed.
        reference: String,
        /// Outcome, rendered for logs.
        outcome: String,
    },

    /// Webhook signature did not match the configured secret.
    #[error("Invalid webhook signature")]
    SignatureInvalid,

    /// Payment gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedReference(_) => "MALFORMED_REFERENCE",
            Self::SaleNotFound(_) => "SALE_NOT_FOUND",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::ReferenceMismatch { .. } => "REFERENCE_MISMATCH",
            Self::UnsupportedOutcome { .. } => "UNSUPPORTED_OUTCOME",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::Gateway(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::MalformedReference(_) | Self::ReferenceMismatch { .. } => 400,
            Self::SignatureInvalid => 401,
            Self::SaleNotFound(_) => 404,
            Self::AmountMismatch { .. }
            | Self::CurrencyMismatch { .. }
            | Self::UnsupportedOutcome { .. } => 422,
            Self::Gateway(e) => e.http_status_code(),
            Self::Ledger(e) => e.http_status_code(),
            Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_retryable(),
            Self::Ledger(e) => e.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
