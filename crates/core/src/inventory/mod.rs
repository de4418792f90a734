//! Inventory side effects of confirmed sales.
//!
//! - Product and variant types
//! - Variant attribute matching
//! - The applier that decrements stock and records sold/revenue

pub mod applier;
pub mod error;
pub mod matcher;
pub mod types;

pub use applier::{AppliedItem, InventoryApplier, InventoryReport, SkippedItem};
pub use error::InventoryError;
pub use matcher::attributes_match;
pub use types::{Product, StockTarget, Variant, VariantAttribute, VariantAttributes, floored_decrement};
