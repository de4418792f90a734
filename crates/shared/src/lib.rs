//! Shared types, errors, and configuration for Storeledger.
//!
//! This crate provides common types used across all other crates:
//! - Money helpers with decimal precision and minor-unit conversion
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Access and lookup errors for the HTTP layer
//! - Configuration management
//! - Validation of session tokens issued by the auth service

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, Role};
pub use config::AppConfig;
pub use error::AppError;
pub use jwt::{JwtError, JwtService};
