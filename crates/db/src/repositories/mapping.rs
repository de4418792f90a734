//! Conversions between rows and domain values.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use storeledger_core::inventory::{Product, Variant, VariantAttributes};
use storeledger_core::sale::{
    Customer, FulfillmentStatus, PaymentMethod, PaymentStatus, SaleLineItem,
};
use storeledger_core::wallet::{LedgerTransaction, TransactionStatus, TransactionType, Wallet};
use storeledger_shared::types::{Currency, from_minor_units, to_minor_units};

use super::error::RepositoryError;
use crate::entities::{
    ledger_transactions, product_variants, products, sea_orm_active_enums as db, wallets,
};

pub(crate) fn minor(amount: Decimal) -> Result<i64, RepositoryError> {
    to_minor_units(amount).map_err(RepositoryError::corrupt)
}

pub(crate) fn currency(code: &str) -> Result<Currency, RepositoryError> {
    Currency::from_str(code).map_err(RepositoryError::corrupt)
}

pub(crate) fn utc(ts: DateTimeWithTimeZone) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

pub(crate) fn items_to_json(items: &[SaleLineItem]) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(items).map_err(RepositoryError::corrupt)
}

pub(crate) fn items_from_json(
    value: serde_json::Value,
) -> Result<Vec<SaleLineItem>, RepositoryError> {
    serde_json::from_value(value).map_err(RepositoryError::corrupt)
}

pub(crate) fn customer(email: String, name: Option<String>, phone: Option<String>) -> Customer {
    Customer { email, name, phone }
}

pub(crate) fn wallet(model: wallets::Model) -> Result<Wallet, RepositoryError> {
    Ok(Wallet {
        id: model.id.into(),
        account_id: model.account_id.into(),
        available: from_minor_units(model.available_minor),
        ledger: from_minor_units(model.ledger_minor),
        currency: currency(&model.currency)?,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn transaction(model: ledger_transactions::Model) -> LedgerTransaction {
    LedgerTransaction {
        id: model.id.into(),
        wallet_id: model.wallet_id.into(),
        amount: from_minor_units(model.amount_minor),
        transaction_type: model.transaction_type.into(),
        status: model.status.into(),
        description: model.description,
        reference: model.reference,
        counterparty: model.counterparty,
        gateway_reference: model.gateway_reference,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    }
}

pub(crate) fn product(
    model: products::Model,
    variants: Vec<product_variants::Model>,
) -> Result<Product, RepositoryError> {
    let variants = variants
        .into_iter()
        .map(|v| {
            let attributes: VariantAttributes =
                serde_json::from_value(v.attributes).map_err(RepositoryError::corrupt)?;
            Ok(Variant {
                id: v.id.into(),
                attributes,
                price: from_minor_units(v.price_minor),
                stock: v.stock,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    Ok(Product {
        id: model.id.into(),
        name: model.name,
        price: from_minor_units(model.price_minor),
        stock: model.stock,
        sold: model.sold,
        revenue: from_minor_units(model.revenue_minor),
        variants,
    })
}

impl From<db::TransactionType> for TransactionType {
    fn from(value: db::TransactionType) -> Self {
        match value {
            db::TransactionType::Credit => Self::Credit,
            db::TransactionType::Debit => Self::Debit,
        }
    }
}

impl From<TransactionType> for db::TransactionType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Credit => Self::Credit,
            TransactionType::Debit => Self::Debit,
        }
    }
}

impl From<db::TransactionStatus> for TransactionStatus {
    fn from(value: db::TransactionStatus) -> Self {
        match value {
            db::TransactionStatus::Pending => Self::Pending,
            db::TransactionStatus::Successful => Self::Successful,
            db::TransactionStatus::Failed => Self::Failed,
            db::TransactionStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<TransactionStatus> for db::TransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Successful => Self::Successful,
            TransactionStatus::Failed => Self::Failed,
            TransactionStatus::Reversed => Self::Reversed,
        }
    }
}

impl From<db::PaymentStatus> for PaymentStatus {
    fn from(value: db::PaymentStatus) -> Self {
        match value {
            db::PaymentStatus::Pending => Self::Pending,
            db::PaymentStatus::Paid => Self::Paid,
            db::PaymentStatus::Failed => Self::Failed,
            db::PaymentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<PaymentStatus> for db::PaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Paid => Self::Paid,
            PaymentStatus::Failed => Self::Failed,
            PaymentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<db::FulfillmentStatus> for FulfillmentStatus {
    fn from(value: db::FulfillmentStatus) -> Self {
        match value {
            db::FulfillmentStatus::Pending => Self::Pending,
            db::FulfillmentStatus::Processing => Self::Processing,
            db::FulfillmentStatus::Shipped => Self::Shipped,
            db::FulfillmentStatus::Delivered => Self::Delivered,
            db::FulfillmentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<FulfillmentStatus> for db::FulfillmentStatus {
    fn from(value: FulfillmentStatus) -> Self {
        match value {
            FulfillmentStatus::Pending => Self::Pending,
            FulfillmentStatus::Processing => Self::Processing,
            FulfillmentStatus::Shipped => Self::Shipped,
            FulfillmentStatus::Delivered => Self::Delivered,
            FulfillmentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<db::PaymentMethod> for PaymentMethod {
    fn from(value: db::PaymentMethod) -> Self {
        match value {
            db::PaymentMethod::Card => Self::Card,
            db::PaymentMethod::BankTransfer => Self::BankTransfer,
            db::PaymentMethod::Cash => Self::Cash,
            db::PaymentMethod::QrCode => Self::QrCode,
        }
    }
}

impl From<PaymentMethod> for db::PaymentMethod {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::Card => Self::Card,
            PaymentMethod::BankTransfer => Self::BankTransfer,
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::QrCode => Self::QrCode,
        }
    }
}
