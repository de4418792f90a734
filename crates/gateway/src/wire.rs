//! Flutterwave v3 request and response bodies.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HttpError;

/// `{status, message, data}` wrapper around every response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T, HttpError> {
        if !self.status.eq_ignore_ascii_case("success") {
            return Err(HttpError::Envelope(self.message));
        }
        self.data
            .ok_or_else(|| HttpError::Decode(format!("missing data: {}", self.message)))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChargeCustomer<'a> {
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonenumber: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChargePayload<'a> {
    pub tx_ref: &'a str,
    pub amount: Value,
    pub currency: &'a str,
    pub redirect_url: &'a str,
    pub customer: ChargeCustomer<'a>,
    pub meta: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentLink {
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyData {
    pub id: Value,
    pub tx_ref: String,
    pub status: String,
    pub amount: Value,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResolveAccountPayload<'a> {
    pub account_number: &'a str,
    pub account_bank: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolvedAccount {
    pub account_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransferPayload<'a> {
    pub account_bank: &'a str,
    pub account_number: &'a str,
    pub amount: Value,
    pub currency: &'a str,
    pub debit_currency: &'a str,
    pub narration: &'a str,
    pub reference: &'a str,
    pub callback_url: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransferData {
    pub id: Value,
    pub status: String,
}

/// Renders an amount as a JSON number, the way the API expects it.
pub(crate) fn amount_value(amount: Decimal) -> Value {
    serde_json::Number::from_str(&amount.normalize().to_string())
        .map_or_else(|_| Value::String(amount.to_string()), Value::Number)
}

/// Reads an amount sent as a JSON number or a numeric string.
pub(crate) fn parse_amount(value: &Value) -> Result<Decimal, HttpError> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(HttpError::Decode(format!("amount is not numeric: {other}"))),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| HttpError::Decode(format!("amount {text}: {e}")))
}

/// Ids arrive as numbers for transactions and transfers; keep them as text.
pub(crate) fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
