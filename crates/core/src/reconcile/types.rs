//! Reconciliation input and output types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::LedgerTransactionId;
use uuid::Uuid;

use crate::inventory::InventoryReport;
use crate::reference::PaymentReference;
use crate::sale::{PaymentStatus, SaleKind};
use crate::wallet::{TransactionStatus, TransactionType};

/// Outcome claimed by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertedOutcome {
    /// Money moved.
    Successful,
    /// Payment or transfer failed.
    Failed,
    /// Customer abandoned the payment.
    Cancelled,
    /// A successful transfer or charge was reversed.
    Reversed,
}

impl AssertedOutcome {
    /// Maps a gateway webhook event to an outcome.
    ///
    /// Returns `None` for events we do not process.
    #[must_use]
    pub fn from_gateway_event(event: &str, status: Option<&str>) -> Option<Self> {
        let succeeded = status.is_some_and(|s| s.eq_ignore_ascii_case("successful"));
        match event {
            "charge.completed" | "transfer.completed" => Some(if succeeded {
                Self::Successful
            } else {
                Self::Failed
            }),
            "charge.failed" | "transfer.failed" => Some(Self::Failed),
            "transfer.reversed" => Some(Self::Reversed),
            _ => None,
        }
    }
}

/// Which entry point produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSource {
    /// Signed server-to-server webhook.
    Webhook,
    /// Browser redirect, re-verified with the gateway.
    Callback,
    /// Same-process completion (cash, QR scan, staff override).
    Local,
}

/// A payment-event notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Raw reference as received.
    pub reference: String,
    /// Claimed outcome.
    pub outcome: AssertedOutcome,
    /// Claimed amount.
    pub amount: Option<Decimal>,
    /// Claimed currency code.
    pub currency: Option<String>,
    /// Gateway transaction id.
    pub gateway_transaction_id: Option<String>,
    /// Where it came from.
    pub source: NotificationSource,
}

/// The record a reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementTarget {
    /// An order or POS transaction.
    Sale {
        /// Sale kind.
        kind: SaleKind,
        /// Sale id.
        id: Uuid,
    },
    /// A wallet funding credit or withdrawal debit.
    Ledger {
        /// Transaction id.
        id: LedgerTransactionId,
        /// Credit or debit.
        transaction_type: TransactionType,
    },
}

/// Where a target stands after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementState {
    /// Still awaiting settlement.
    Pending,
    /// Paid or successfully settled.
    Succeeded,
    /// Failed.
    Failed,
    /// Cancelled by the customer.
    Cancelled,
    /// Reversed after success.
    Reversed,
}

impl From<PaymentStatus> for SettlementState {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Paid => Self::Succeeded,
            PaymentStatus::Failed => Self::Failed,
            PaymentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<TransactionStatus> for SettlementState {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Successful => Self::Succeeded,
            TransactionStatus::Failed => Self::Failed,
            TransactionStatus::Reversed => Self::Reversed,
        }
    }
}

/// Result of processing one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Parsed reference.
    pub reference: PaymentReference,
    /// Record the reference resolved to.
    pub target: SettlementTarget,
    /// State after this call.
    pub state: SettlementState,
    /// True only if this call performed a transition.
    pub applied: bool,
    /// Inventory effects, when this call confirmed a sale.
    pub inventory: Option<InventoryReport>,
}

impl ReconcileOutcome {
    pub(crate) fn unchanged(
        reference: PaymentReference,
        target: SettlementTarget,
        state: SettlementState,
    ) -> Self {
        Self {
            reference,
            target,
            state,
            applied: false,
            inventory: None,
        }
    }
}
