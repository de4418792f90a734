//! Sale types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{Currency, ProductId};
use uuid::Uuid;

use crate::inventory::VariantAttributes;
use crate::reference::ReferenceKind;

/// The two concrete kinds of sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleKind {
    /// Storefront order.
    Order,
    /// Point-of-sale transaction.
    Pos,
}

impl SaleKind {
    /// Reference kind used for this sale kind.
    #[must_use]
    pub const fn reference_kind(self) -> ReferenceKind {
        match self {
            Self::Order => ReferenceKind::Order,
            Self::Pos => ReferenceKind::Pos,
        }
    }

    /// Sale kind for a reference kind, if it denotes a sale.
    #[must_use]
    pub const fn from_reference_kind(kind: ReferenceKind) -> Option<Self> {
        match kind {
            ReferenceKind::Order => Some(Self::Order),
            ReferenceKind::Pos => Some(Self::Pos),
            ReferenceKind::WalletFunding | ReferenceKind::Withdrawal => None,
        }
    }
}

/// Payment status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment.
    Pending,
    /// Payment confirmed.
    Paid,
    /// Payment failed; the customer may retry.
    Failed,
    /// Payment cancelled by the customer.
    Cancelled,
}

impl PaymentStatus {
    /// Returns true if the sale still awaits payment.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    /// Not yet started.
    Pending,
    /// Paid and being prepared.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled.
    Cancelled,
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card through the hosted checkout.
    Card,
    /// Bank transfer through the hosted checkout.
    BankTransfer,
    /// Cash collected at the till.
    Cash,
    /// QR code scanned at the till.
    QrCode,
}

impl PaymentMethod {
    /// Returns true if the payment goes through the gateway's hosted checkout.
    #[must_use]
    pub const fn uses_gateway(self) -> bool {
        matches!(self, Self::Card | Self::BankTransfer)
    }
}

/// Customer contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Email address.
    pub email: String,
    /// Full name.
    #[serde(default)]
    pub name: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

impl Customer {
    /// Placeholder customer for anonymous till sales.
    #[must_use]
    pub fn walk_in() -> Self {
        Self {
            email: "walk-in@pos.local".to_string(),
            name: Some("Walk-in customer".to_string()),
            phone: None,
        }
    }
}

/// A priced line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineItem {
    /// Product sold.
    pub product_id: ProductId,
    /// Variant selector, if any.
    #[serde(default)]
    pub variant: Option<VariantAttributes>,
    /// Units sold.
    pub quantity: u32,
    /// Price per unit at the time of sale.
    pub unit_price: Decimal,
}

impl SaleLineItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An order or POS transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique identifier.
    pub id: Uuid,
    /// Order or POS.
    pub kind: SaleKind,
    /// Idempotency key shared with the gateway.
    pub reference: String,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Fulfillment status (orders only).
    pub fulfillment_status: Option<FulfillmentStatus>,
    /// Amount due.
    pub total: Decimal,
    /// Currency of `total`.
    pub currency: Currency,
    /// Priced line items.
    pub items: Vec<SaleLineItem>,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Gateway transaction id, once known.
    pub gateway_transaction_id: Option<String>,
    /// Customer.
    pub customer: Customer,
    /// When the sale was created.
    pub created_at: DateTime<Utc>,
    /// When the sale was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a pending sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    /// Pre-assigned id; the reference embeds it.
    pub id: Uuid,
    /// Order or POS.
    pub kind: SaleKind,
    /// Idempotency key.
    pub reference: String,
    /// Amount due.
    pub total: Decimal,
    /// Currency of `total`.
    pub currency: Currency,
    /// Priced line items.
    pub items: Vec<SaleLineItem>,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Customer.
    pub customer: Customer,
}

/// A conditional `pending -> to` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleTransition {
    /// Target payment status.
    pub to: PaymentStatus,
    /// New fulfillment status (orders only).
    pub fulfillment: Option<FulfillmentStatus>,
    /// Gateway transaction id to record.
    pub gateway_transaction_id: Option<String>,
}

impl SaleTransition {
    /// Transition for a confirmed payment. Orders move on to `processing`.
    #[must_use]
    pub fn paid(kind: SaleKind, gateway_transaction_id: Option<String>) -> Self {
        Self {
            to: PaymentStatus::Paid,
            fulfillment: matches!(kind, SaleKind::Order).then_some(FulfillmentStatus::Processing),
            gateway_transaction_id,
        }
    }

    /// Transition for a failed or cancelled payment.
    #[must_use]
    pub fn unpaid(to: PaymentStatus, gateway_transaction_id: Option<String>) -> Self {
        Self {
            to,
            fulfillment: None,
            gateway_transaction_id,
        }
    }
}
