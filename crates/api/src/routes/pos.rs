//! Point-of-sale routes. Staff and admin only.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use storeledger_core::sale::{CartItem, Customer, PaymentMethod, SaleKind};

use super::orders::{SaleResponse, complete_locally, payment_status};
use crate::error::ApiError;
use crate::{AppState, middleware::AuthUser};

/// Creates the POS routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pos/transactions", post(create_pos_transaction))
        .route(
            "/pos/transactions/{transaction_id}/complete",
            post(complete_pos_transaction),
        )
        .route(
            "/pos/transactions/{transaction_id}/payment-status",
            get(pos_payment_status),
        )
}

/// Request body for ringing up a sale.
#[derive(Debug, Deserialize)]
pub struct CreatePosTransactionRequest {
    /// Cart lines.
    pub items: Vec<CartItem>,
    /// How the customer pays.
    pub payment_method: PaymentMethod,
    /// Customer details; anonymous walk-in when omitted.
    #[serde(default)]
    pub customer: Option<Customer>,
}

async fn create_pos_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreatePosTransactionRequest>,
) -> Response {
    if let Err(e) = auth.require_till_operator() {
        return e.into_response();
    }

    let customer = payload.customer.unwrap_or_else(Customer::walk_in);
    let redirect_url = state.config.app.callback_url();

    match state
        .checkout
        .create_pos_sale(customer, &payload.items, payload.payment_method, &redirect_url)
        .await
    {
        Ok(result) => {
            info!(
                transaction_id = %result.sale.id,
                operator = %auth.account_id(),
                method = ?payload.payment_method,
                status = ?result.sale.payment_status,
                "POS sale opened"
            );
            (StatusCode::CREATED, Json(SaleResponse::from(result))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Confirms cash collected or a scanned QR payment.
async fn complete_pos_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Response {
    if let Err(e) = auth.require_till_operator() {
        return e.into_response();
    }
    complete_locally(&state, SaleKind::Pos, transaction_id).await
}

async fn pos_payment_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Response {
    if let Err(e) = auth.require_till_operator() {
        return e.into_response();
    }
    payment_status(&state, SaleKind::Pos, transaction_id).await
}
