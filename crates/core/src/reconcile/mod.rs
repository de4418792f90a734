//! Payment settlement reconciliation.
//!
//! Three independent signals report the outcome of a payment: the browser
//! redirect callback, the gateway webhook and local completion at the till.
//! They can arrive in any order and any number of times. The reconciler
//! collapses them into exactly one status transition, and runs the balance
//! and inventory side effects only from the call that performed it.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ReconcileError;
pub use service::Reconciler;
pub use types::{
    AssertedOutcome, Notification, NotificationSource, ReconcileOutcome, SettlementState,
    SettlementTarget,
};
