//! Flutterwave v3 client.
//!
//! Implements `storeledger_core::gateway::PaymentGateway` over HTTP with a
//! per-request timeout. Idempotent reads are retried with exponential
//! backoff; charges and transfers are sent exactly once.

pub mod client;
pub mod error;
pub mod retry;
mod wire;

pub use client::FlutterwaveClient;
pub use error::HttpError;
pub use retry::{RetryConfig, RetryPolicy};
