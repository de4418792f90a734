//! Payment gateway port.
//!
//! The gateway is an external collaborator reached over HTTP. Timeouts are
//! reported separately from rejections: a timed out call may still have
//! happened on the gateway side, a rejected one did not.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::Currency;
use thiserror::Error;

use crate::sale::Customer;

/// Errors returned by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No answer within the configured timeout. Outcome unknown.
    #[error("Gateway timed out: {0}")]
    Timeout(String),

    /// The gateway answered and refused the request. Terminal.
    #[error("Gateway rejected the request: {0}")]
    Rejected(String),

    /// Gateway unreachable or answered 5xx. Safe to retry later.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway answered with something we could not understand.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "GATEWAY_TIMEOUT",
            Self::Rejected(_) => "GATEWAY_REJECTED",
            Self::Unavailable(_) => "GATEWAY_UNAVAILABLE",
            Self::InvalidResponse(_) => "GATEWAY_INVALID_RESPONSE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Timeout(_) => 504,
            Self::Rejected(_) | Self::Unavailable(_) | Self::InvalidResponse(_) => 502,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// Request to open a hosted checkout.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    /// Our reference (`tx_ref`).
    pub reference: String,
    /// Amount to charge.
    pub amount: Decimal,
    /// Charge currency.
    pub currency: Currency,
    /// Where the gateway sends the browser afterwards.
    pub redirect_url: String,
    /// Paying customer.
    pub customer: Customer,
    /// Free-form metadata echoed back on webhooks.
    pub meta: serde_json::Value,
}

/// Transaction details as reported by the gateway's verify endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    /// Gateway transaction id.
    pub id: String,
    /// Gateway status (`successful`, `failed`, `pending`, ...).
    pub status: String,
    /// Amount the gateway recorded.
    pub amount: Decimal,
    /// Currency the gateway recorded.
    pub currency: String,
    /// Our reference as the gateway recorded it.
    pub tx_ref: String,
}

impl VerifiedTransaction {
    /// Returns true if the gateway reports the charge as successful.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status.eq_ignore_ascii_case("successful")
    }

    /// Returns true if the gateway reports the charge as still in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status.eq_ignore_ascii_case("pending")
    }
}

/// Request to pay out to a bank account.
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    /// Destination account number.
    pub account_number: String,
    /// Destination bank code.
    pub bank_code: String,
    /// Amount to send.
    pub amount: Decimal,
    /// Transfer currency.
    pub currency: Currency,
    /// Our reference, echoed on transfer webhooks.
    pub reference: String,
    /// Webhook target for the transfer result.
    pub callback_url: String,
    /// Text shown on the recipient's statement.
    pub narration: String,
}

/// Gateway acknowledgement of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Gateway transfer id.
    pub transfer_id: String,
    /// Gateway status (`NEW`, `PENDING`, `FAILED`, ...).
    pub status: String,
}

impl TransferReceipt {
    /// Returns true if the gateway already reports the transfer as failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status.eq_ignore_ascii_case("failed")
    }
}

/// Operations offered by the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout and returns the payment link.
    async fn initialize_charge(&self, request: &ChargeRequest) -> Result<String, GatewayError>;

    /// Fetches the authoritative state of a charge by gateway transaction id.
    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedTransaction, GatewayError>;

    /// Resolves the holder name of a bank account.
    async fn verify_bank_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, GatewayError>;

    /// Starts a payout.
    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, GatewayError>;
}
