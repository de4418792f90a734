//! Wallet and ledger transaction types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{AccountId, Currency, LedgerTransactionId, WalletId};

use super::balance::BalanceDelta;

/// A wallet owned by exactly one account.
///
/// `available` is what the owner can spend now; `ledger` is what has actually
/// settled. A pending withdrawal has already left `available` but not `ledger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique identifier.
    pub id: WalletId,
    /// Owning account.
    pub account_id: AccountId,
    /// Spendable balance.
    pub available: Decimal,
    /// Settled balance.
    pub ledger: Decimal,
    /// Wallet currency.
    pub currency: Currency,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
    /// When the wallet was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Creates an empty wallet for an account.
    #[must_use]
    pub fn open(account_id: AccountId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: WalletId::new(),
            account_id,
            available: Decimal::ZERO,
            ledger: Decimal::ZERO,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a balance delta in place.
    pub fn apply(&mut self, delta: BalanceDelta) {
        self.available += delta.available;
        self.ledger += delta.ledger;
    }
}

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money into the wallet.
    Credit,
    /// Money out of the wallet.
    Debit,
}

/// Lifecycle status of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled successfully.
    Successful,
    /// Settlement failed.
    Failed,
    /// A successful settlement was reversed by the gateway.
    Reversed,
}

impl TransactionStatus {
    /// Returns true if `next` is a legal transition from `self`.
    ///
    /// ```text
    /// pending -> successful | failed
    /// successful -> reversed
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Successful | Self::Failed) | (Self::Successful, Self::Reversed)
        )
    }

    /// Returns true once the transaction no longer awaits settlement.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Outcome of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    /// Funds moved.
    Successful,
    /// Funds did not move.
    Failed,
}

impl SettlementOutcome {
    /// Status a pending transaction ends in.
    #[must_use]
    pub const fn status(self) -> TransactionStatus {
        match self {
            Self::Successful => TransactionStatus::Successful,
            Self::Failed => TransactionStatus::Failed,
        }
    }
}

/// An append-only ledger record. Only `status` and `gateway_reference` change
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier.
    pub id: LedgerTransactionId,
    /// Wallet this transaction belongs to.
    pub wallet_id: WalletId,
    /// Positive amount.
    pub amount: Decimal,
    /// Credit or debit.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Current status.
    pub status: TransactionStatus,
    /// Human readable description.
    pub description: String,
    /// Globally unique idempotency key.
    pub reference: String,
    /// Other side of the movement (payer, bank account, ...).
    pub counterparty: String,
    /// Gateway-side id, once known.
    pub gateway_reference: Option<String>,
    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
    /// When the transaction was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new pending transaction.
#[derive(Debug, Clone)]
pub struct NewLedgerTransaction {
    /// Pre-assigned id; the reference embeds it.
    pub id: LedgerTransactionId,
    /// Wallet to record against.
    pub wallet_id: WalletId,
    /// Positive amount.
    pub amount: Decimal,
    /// Credit or debit.
    pub transaction_type: TransactionType,
    /// Human readable description.
    pub description: String,
    /// Idempotency key.
    pub reference: String,
    /// Other side of the movement.
    pub counterparty: String,
}

/// Result of `apply_settlement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementApplied {
    /// This call moved the transaction out of pending and applied its balances.
    Applied(LedgerTransaction),
    /// The transaction was already settled; nothing changed.
    AlreadySettled(LedgerTransaction),
}

impl SettlementApplied {
    /// The transaction as stored after the call.
    #[must_use]
    pub const fn transaction(&self) -> &LedgerTransaction {
        match self {
            Self::Applied(tx) | Self::AlreadySettled(tx) => tx,
        }
    }

    /// Returns true if this call performed the transition.
    #[must_use]
    pub const fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
