//! Applies the inventory side effects of a confirmed sale.
//!
//! Runs once per sale, after the sale's own `pending -> paid` transition.
//! Failures are per item: they are logged with the sale reference and
//! skipped, and never undo the payment.

use std::sync::Arc;

use serde::Serialize;
use storeledger_shared::types::{ProductId, VariantId};
use tracing::error;

use super::error::InventoryError;
use super::types::StockTarget;
use crate::sale::SaleLineItem;
use crate::store::InventoryStore;

/// A line item whose stock and counters were updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedItem {
    /// Product updated.
    pub product_id: ProductId,
    /// Variant decremented, if any.
    pub variant_id: Option<VariantId>,
    /// Units removed from stock.
    pub quantity: u32,
}

/// A line item that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    /// Product the item referred to.
    pub product_id: ProductId,
    /// Error code of the failure.
    pub reason: String,
}

/// Result of applying a sale's inventory effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryReport {
    /// Items applied.
    pub applied: Vec<AppliedItem>,
    /// Items skipped.
    pub skipped: Vec<SkippedItem>,
}

impl InventoryReport {
    /// Returns true if every item was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Decrements stock and records sold/revenue for confirmed sales.
#[derive(Clone)]
pub struct InventoryApplier {
    store: Arc<dyn InventoryStore>,
}

impl InventoryApplier {
    /// Creates a new applier.
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Applies stock decrements and sales counters for every line item.
    pub async fn apply_sale_effects(&self, reference: &str, items: &[SaleLineItem]) -> InventoryReport {
        let mut report = InventoryReport::default();

        for item in items {
            match self.apply_item(item).await {
                Ok(variant_id) => report.applied.push(AppliedItem {
                    product_id: item.product_id,
                    variant_id,
                    quantity: item.quantity,
                }),
                Err(e) => {
                    error!(
                        reference,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %e,
                        "Inventory update skipped"
                    );
                    report.skipped.push(SkippedItem {
                        product_id: item.product_id,
                        reason: e.error_code().to_string(),
                    });
                }
            }
        }

        report
    }

    async fn apply_item(&self, item: &SaleLineItem) -> Result<Option<VariantId>, InventoryError> {
        let product = self
            .store
            .find_product(item.product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound(item.product_id))?;

        let variant_id = match product.resolve(item.variant.as_ref())? {
            StockTarget::Variant(variant) => {
                self.store
                    .decrement_variant_stock(variant.id, item.quantity)
                    .await?;
                Some(variant.id)
            }
            StockTarget::Product => {
                self.store
                    .decrement_product_stock(product.id, item.quantity)
                    .await?;
                None
            }
        };

        self.store
            .record_sale(product.id, item.quantity, item.line_total())
            .await?;

        Ok(variant_id)
    }
}
