//! Inventory error types.

use storeledger_shared::types::ProductId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while resolving or updating stock.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// No variant of the product matches the selector.
    #[error("No variant of product {product_id} matches [{selector}]")]
    VariantNotFound {
        /// The product searched.
        product_id: ProductId,
        /// The selector, rendered for logs.
        selector: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::VariantNotFound { .. } => "VARIANT_NOT_FOUND",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ProductNotFound(_) => 404,
            Self::VariantNotFound { .. } => 400,
            Self::Store(e) => e.http_status_code(),
        }
    }
}
