//! Cart pricing and checkout initiation.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{Currency, ProductId};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::types::{
    Customer, NewSale, PaymentMethod, PaymentStatus, Sale, SaleKind, SaleLineItem, SaleTransition,
};
use crate::gateway::{ChargeRequest, GatewayError, PaymentGateway};
use crate::inventory::{InventoryError, VariantAttributes};
use crate::reconcile::{ReconcileError, Reconciler};
use crate::reference::PaymentReference;
use crate::store::{InventoryStore, SaleStore, StoreError};

/// Errors raised while opening a sale.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A line asks for zero units.
    #[error("Quantity must be at least 1 for product {0}")]
    InvalidQuantity(ProductId),

    /// Product or variant lookup failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Payment gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Local completion failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyCart => "EMPTY_CART",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::Inventory(e) => e.error_code(),
            Self::Gateway(e) => e.error_code(),
            Self::Reconcile(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::EmptyCart | Self::InvalidQuantity(_) => 400,
            // An unknown product in a cart is a bad request, not a missing route.
            Self::Inventory(InventoryError::ProductNotFound(_)) => 400,
            Self::Inventory(e) => e.http_status_code(),
            Self::Gateway(e) => e.http_status_code(),
            Self::Reconcile(e) => e.http_status_code(),
            Self::Store(e) => e.http_status_code(),
        }
    }
}

/// A requested cart line, before pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Product to buy.
    pub product_id: ProductId,
    /// Variant selector, if any.
    #[serde(default)]
    pub variant: Option<VariantAttributes>,
    /// Units to buy.
    pub quantity: u32,
}

/// A cart priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    /// Priced line items.
    pub items: Vec<SaleLineItem>,
    /// Sum of line totals.
    pub total: Decimal,
}

/// Prices every line from the catalog.
///
/// Uses the variant price when the selector matches a variant and the
/// product price otherwise. Client-supplied prices are never trusted.
pub async fn price_cart(
    inventory: &dyn InventoryStore,
    items: &[CartItem],
) -> Result<PricedCart, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut priced = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;

    for item in items {
        if item.quantity == 0 {
            return Err(CheckoutError::InvalidQuantity(item.product_id));
        }
        let product = inventory
            .find_product(item.product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound(item.product_id))?;
        let unit_price = product.unit_price(item.variant.as_ref())?;

        let line = SaleLineItem {
            product_id: item.product_id,
            variant: item.variant.clone().filter(|v| !v.is_empty()),
            quantity: item.quantity,
            unit_price,
        };
        total += line.line_total();
        priced.push(line);
    }

    Ok(PricedCart {
        items: priced,
        total,
    })
}

/// An opened sale.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    /// The sale as stored after the call.
    pub sale: Sale,
    /// Hosted checkout link, for gateway payment methods.
    pub payment_link: Option<String>,
}

/// Opens orders and POS sales.
#[derive(Clone)]
pub struct CheckoutService {
    sales: Arc<dyn SaleStore>,
    inventory: Arc<dyn InventoryStore>,
    gateway: Arc<dyn PaymentGateway>,
    reconciler: Reconciler,
    currency: Currency,
}

impl CheckoutService {
    /// Creates a new checkout service.
    pub fn new(
        sales: Arc<dyn SaleStore>,
        inventory: Arc<dyn InventoryStore>,
        gateway: Arc<dyn PaymentGateway>,
        reconciler: Reconciler,
        currency: Currency,
    ) -> Self {
        Self {
            sales,
            inventory,
            gateway,
            reconciler,
            currency,
        }
    }

    /// Opens a storefront order paid through the hosted checkout.
    pub async fn create_order(
        &self,
        customer: Customer,
        items: &[CartItem],
        redirect_url: &str,
    ) -> Result<CheckoutResult, CheckoutError> {
        let sale = self
            .open(SaleKind::Order, customer, items, PaymentMethod::Card)
            .await?;
        let payment_link = self.charge(&sale, redirect_url).await?;
        Ok(CheckoutResult {
            sale,
            payment_link: Some(payment_link),
        })
    }

    /// Opens a POS sale.
    ///
    /// Cash completes in the same call. Card and bank transfer get a payment
    /// link. QR code stays pending until the till confirms it.
    pub async fn create_pos_sale(
        &self,
        customer: Customer,
        items: &[CartItem],
        method: PaymentMethod,
        redirect_url: &str,
    ) -> Result<CheckoutResult, CheckoutError> {
        let sale = self.open(SaleKind::Pos, customer, items, method).await?;

        match method {
            PaymentMethod::Cash => {
                self.reconciler.complete_locally(SaleKind::Pos, sale.id).await?;
                let sale = self
                    .sales
                    .find_sale(SaleKind::Pos, sale.id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(sale.reference.clone()))?;
                Ok(CheckoutResult {
                    sale,
                    payment_link: None,
                })
            }
            PaymentMethod::Card | PaymentMethod::BankTransfer => {
                let payment_link = self.charge(&sale, redirect_url).await?;
                Ok(CheckoutResult {
                    sale,
                    payment_link: Some(payment_link),
                })
            }
            PaymentMethod::QrCode => Ok(CheckoutResult {
                sale,
                payment_link: None,
            }),
        }
    }

    async fn open(
        &self,
        kind: SaleKind,
        customer: Customer,
        items: &[CartItem],
        method: PaymentMethod,
    ) -> Result<Sale, CheckoutError> {
        let cart = price_cart(self.inventory.as_ref(), items).await?;
        let id = Uuid::now_v7();
        let reference = PaymentReference::issue(kind.reference_kind(), id).to_string();

        let sale = self
            .sales
            .create_sale(NewSale {
                id,
                kind,
                reference,
                total: cart.total,
                currency: self.currency,
                items: cart.items,
                payment_method: method,
                customer,
            })
            .await?;

        info!(
            reference = %sale.reference,
            sale_id = %sale.id,
            total = %sale.total,
            method = ?method,
            "Sale opened"
        );
        Ok(sale)
    }

    async fn charge(&self, sale: &Sale, redirect_url: &str) -> Result<String, CheckoutError> {
        let request = ChargeRequest {
            reference: sale.reference.clone(),
            amount: sale.total,
            currency: sale.currency,
            redirect_url: redirect_url.to_string(),
            customer: sale.customer.clone(),
            meta: serde_json::json!({ "sale_id": sale.id, "kind": sale.kind }),
        };

        match self.gateway.initialize_charge(&request).await {
            Ok(link) => Ok(link),
            Err(e) => {
                warn!(reference = %sale.reference, error = %e, "Could not open checkout, sale failed");
                self.sales
                    .transition_payment_status(
                        sale.kind,
                        sale.id,
                        &SaleTransition::unpaid(PaymentStatus::Failed, None),
                    )
                    .await?;
                Err(e.into())
            }
        }
    }
}
