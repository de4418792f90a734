//! Storage ports.
//!
//! The settlement logic talks to persistence only through these traits. The
//! database crate implements them with atomic conditional updates; tests use
//! in-memory implementations.
//!
//! Every state-changing method that guards an idempotency boundary reports
//! whether *this call* performed the change, so callers can run side effects
//! exactly once without read-then-write races.

use async_trait::async_trait;
use rust_decimal::Decimal;
use storeledger_shared::types::{
    AccountId, Currency, LedgerTransactionId, PageRequest, ProductId, VariantId, WalletId,
};
use thiserror::Error;
use uuid::Uuid;

use crate::inventory::Product;
use crate::sale::{NewSale, Sale, SaleKind, SaleTransition};
use crate::wallet::{
    LedgerError, LedgerTransaction, NewLedgerTransaction, SettlementApplied, SettlementOutcome,
    Wallet,
};

/// Storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(String),

    /// A row the operation depends on does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint or similar conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped to a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Corrupt(_) => "CORRUPT_RECORD",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Corrupt(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Conflict(_))
    }
}

/// Orders and POS transactions.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Persists a new pending sale.
    async fn create_sale(&self, sale: NewSale) -> Result<Sale, StoreError>;

    /// Loads a sale by kind and id.
    async fn find_sale(&self, kind: SaleKind, id: Uuid) -> Result<Option<Sale>, StoreError>;

    /// Moves a sale out of `pending`.
    ///
    /// Must be a single conditional update on `payment_status = 'pending'`.
    /// Returns `true` only if this call performed the transition.
    async fn transition_payment_status(
        &self,
        kind: SaleKind,
        id: Uuid,
        transition: &SaleTransition,
    ) -> Result<bool, StoreError>;
}

/// Wallets and their append-only transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the account's wallet, creating it if needed.
    ///
    /// Concurrent calls for one account resolve to the same stored wallet.
    async fn get_or_create_wallet(
        &self,
        account_id: AccountId,
        currency: Currency,
    ) -> Result<Wallet, LedgerError>;

    /// Loads the account's wallet, if any.
    async fn find_wallet_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Wallet>, LedgerError>;

    /// Loads a wallet by id.
    ///
    /// Fails with `LedgerError::WalletNotFound` if it does not exist.
    async fn wallet_by_id(&self, wallet_id: WalletId) -> Result<Wallet, LedgerError>;

    /// Records a pending transaction.
    ///
    /// Fails with `LedgerError::DuplicateReference` if the reference exists.
    async fn create_transaction(
        &self,
        tx: NewLedgerTransaction,
    ) -> Result<LedgerTransaction, LedgerError>;

    /// Looks a transaction up by its reference.
    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerTransaction>, LedgerError>;

    /// Stores the gateway-side id of a transaction.
    async fn set_gateway_reference(
        &self,
        id: LedgerTransactionId,
        gateway_reference: &str,
    ) -> Result<(), LedgerError>;

    /// Settles a pending transaction and applies its balance delta.
    ///
    /// The status change and the wallet update commit together. Already
    /// settled transactions are returned unchanged.
    async fn apply_settlement(
        &self,
        id: LedgerTransactionId,
        outcome: SettlementOutcome,
    ) -> Result<SettlementApplied, LedgerError>;

    /// Reverses a successful transaction. Returns `true` only if this call
    /// performed the reversal.
    async fn reverse(&self, id: LedgerTransactionId) -> Result<bool, LedgerError>;

    /// Moves `amount` out of `available` if at least that much is available.
    ///
    /// Fails with `LedgerError::InsufficientFunds` otherwise.
    async fn place_hold(&self, wallet_id: WalletId, amount: Decimal)
    -> Result<Wallet, LedgerError>;

    /// Returns a hold to `available`.
    async fn release_hold(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, LedgerError>;

    /// Lists a wallet's transactions, newest first, with the total count.
    async fn list_transactions(
        &self,
        wallet_id: WalletId,
        page: &PageRequest,
    ) -> Result<(Vec<LedgerTransaction>, u64), LedgerError>;
}

/// Product stock and sales counters.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Loads a product with its variants.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Decrements a variant's stock, floored at zero.
    async fn decrement_variant_stock(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), StoreError>;

    /// Decrements a product's flat stock, floored at zero.
    async fn decrement_product_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StoreError>;

    /// Adds a confirmed sale to the product's `sold` and `revenue` counters.
    async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: u32,
        revenue: Decimal,
    ) -> Result<(), StoreError>;
}
