//! Flutterwave webhook receiver.
//!
//! The gateway retries deliveries that do not get a 2xx, so every request
//! that passes the signature check is acknowledged with `200` whatever
//! happens downstream. Failures are logged; the reconciler makes redelivery
//! safe.

use std::str::FromStr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use storeledger_core::reconcile::{
    AssertedOutcome, Notification, NotificationSource, ReconcileError,
};

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the shared webhook secret.
pub const SIGNATURE_HEADER: &str = "verif-hash";

/// Creates the webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/flutterwave", post(flutterwave_webhook))
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    event: String,
    #[serde(default)]
    data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookData {
    #[serde(default)]
    id: Option<Value>,
    /// Charges carry our reference here.
    #[serde(default)]
    tx_ref: Option<String>,
    /// Transfers carry our reference here.
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    status: Option<String>,
    /// Amount the customer was asked for, before fees.
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    currency: Option<String>,
}

fn received() -> Response {
    (StatusCode::OK, Json(json!({ "status": "received" }))).into_response()
}

async fn flutterwave_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if !state.webhook_signature_matches(signature) {
        warn!("Rejected webhook with a missing or wrong signature");
        return ApiError::from(ReconcileError::SignatureInvalid).into_response();
    }
    if !state.webhook_secret_configured() {
        warn!("Processing unauthenticated webhook; configure a webhook secret");
    }

    match serde_json::from_slice::<WebhookPayload>(&body) {
        Ok(payload) => dispatch(&state, payload).await,
        Err(e) => warn!(error = %e, "Ignoring unparseable webhook body"),
    }

    received()
}

async fn dispatch(state: &AppState, payload: WebhookPayload) {
    let WebhookPayload { event, data } = payload;

    let Some(outcome) = AssertedOutcome::from_gateway_event(&event, data.status.as_deref()) else {
        info!(event = %event, "Ignoring unhandled webhook event");
        return;
    };

    let Some(reference) = data.tx_ref.or(data.reference) else {
        warn!(event = %event, "Webhook carries no reference");
        return;
    };

    let notification = Notification {
        reference,
        outcome,
        amount: data.amount.as_ref().and_then(parse_amount),
        currency: data.currency,
        gateway_transaction_id: data.id.as_ref().and_then(id_string),
        source: NotificationSource::Webhook,
    };

    match state.reconciler.process(&notification).await {
        Ok(result) => info!(
            event = %event,
            reference = %notification.reference,
            state = ?result.state,
            applied = result.applied,
            "Webhook reconciled"
        ),
        Err(e) if e.is_retryable() => error!(
            event = %event,
            reference = %notification.reference,
            error = %e,
            "Webhook processing failed; left pending for the redirect callback or a redelivered event"
        ),
        Err(e) => warn!(
            event = %event,
            reference = %notification.reference,
            code = e.error_code(),
            error = %e,
            "Webhook rejected"
        ),
    }
}

/// Reads an amount sent either as a JSON number or a string.
fn parse_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
