//! Core settlement logic for Storeledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence and the payment gateway are reached through the ports in
//! [`store`] and [`gateway`].
//!
//! # Modules
//!
//! - `reference` - Payment reference format and parsing
//! - `wallet` - Wallet ledger, balance algebra, funding and withdrawals
//! - `sale` - Orders, POS transactions and checkout
//! - `inventory` - Variant matching and stock side effects
//! - `reconcile` - Exactly-once settlement of payment notifications
//! - `store` - Storage ports
//! - `gateway` - Payment gateway port

pub mod gateway;
pub mod inventory;
pub mod reconcile;
pub mod reference;
pub mod sale;
pub mod store;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;
