//! Wallet ledger.
//!
//! This module implements the wallet side of settlement:
//! - Wallet and ledger transaction types
//! - Balance algebra for settlements, holds and reversals
//! - Error types for ledger operations
//! - Wallet service for funding and withdrawals

pub mod balance;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::BalanceDelta;
pub use error::LedgerError;
pub use service::{FundingInitiated, WalletService, WithdrawalInitiated, WithdrawalRequest, WithdrawalState};
pub use types::{
    LedgerTransaction, NewLedgerTransaction, SettlementApplied, SettlementOutcome,
    TransactionStatus, TransactionType, Wallet,
};
