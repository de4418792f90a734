//! Storefront order routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::AppError;
use storeledger_shared::types::Currency;
use tracing::info;
use uuid::Uuid;

use storeledger_core::inventory::InventoryReport;
use storeledger_core::reconcile::{ReconcileOutcome, SettlementState};
use storeledger_core::sale::{
    CartItem, CheckoutResult, Customer, FulfillmentStatus, PaymentStatus, Sale, SaleKind,
};

use crate::error::ApiError;
use crate::{AppState, middleware::AuthUser};

/// Creates the public order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{order_id}/payment-status", get(order_payment_status))
}

/// Creates the staff-only order routes.
pub fn staff_routes() -> Router<AppState> {
    Router::new().route("/orders/{order_id}/mark-paid", post(mark_order_paid))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for placing an order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Buyer contact details.
    pub customer: Customer,
    /// Cart lines; prices come from the catalog.
    pub items: Vec<CartItem>,
}

/// Response for a placed order.
#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    /// Order id.
    pub order_id: Uuid,
    /// Payment reference shared with the gateway.
    pub reference: String,
    /// Amount due.
    pub total: Decimal,
    /// Currency of `total`.
    pub currency: Currency,
    /// Always `pending` at this point.
    pub payment_status: PaymentStatus,
    /// Hosted checkout link.
    pub payment_link: Option<String>,
}

impl From<CheckoutResult> for OrderCreatedResponse {
    fn from(result: CheckoutResult) -> Self {
        Self {
            order_id: result.sale.id,
            reference: result.sale.reference,
            total: result.sale.total,
            currency: result.sale.currency,
            payment_status: result.sale.payment_status,
            payment_link: result.payment_link,
        }
    }
}

/// A sale plus the hosted checkout link, when one was opened.
#[derive(Debug, Serialize)]
pub struct SaleResponse {
    /// The stored sale.
    #[serde(flatten)]
    pub sale: Sale,
    /// Where to send the customer to pay.
    pub payment_link: Option<String>,
}

impl From<CheckoutResult> for SaleResponse {
    fn from(result: CheckoutResult) -> Self {
        Self {
            sale: result.sale,
            payment_link: result.payment_link,
        }
    }
}

/// Polling view of a sale's payment.
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    /// Sale id.
    pub id: Uuid,
    /// Payment reference.
    pub reference: String,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Fulfillment status, for orders.
    pub fulfillment_status: Option<FulfillmentStatus>,
}

impl From<Sale> for PaymentStatusResponse {
    fn from(sale: Sale) -> Self {
        Self {
            id: sale.id,
            reference: sale.reference,
            payment_status: sale.payment_status,
            fulfillment_status: sale.fulfillment_status,
        }
    }
}

/// Result of a local settlement.
#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    /// Sale id.
    pub id: Uuid,
    /// Payment reference.
    pub reference: String,
    /// State after the call.
    pub state: SettlementState,
    /// False when the sale was already settled.
    pub applied: bool,
    /// Stock effects, when this call confirmed the payment.
    pub inventory: Option<InventoryReport>,
}

impl SettlementResponse {
    pub(crate) fn new(id: Uuid, outcome: ReconcileOutcome) -> Self {
        Self {
            id,
            reference: outcome.reference.to_string(),
            state: outcome.state,
            applied: outcome.applied,
            inventory: outcome.inventory,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Response {
    let redirect_url = state.config.app.callback_url();
    match state
        .checkout
        .create_order(payload.customer, &payload.items, &redirect_url)
        .await
    {
        Ok(result) => {
            info!(order_id = %result.sale.id, reference = %result.sale.reference, "Order placed");
            (StatusCode::CREATED, Json(OrderCreatedResponse::from(result))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub(crate) async fn payment_status(state: &AppState, kind: SaleKind, id: Uuid) -> Response {
    match state.sales.find_sale(kind, id).await {
        Ok(Some(sale)) => Json(PaymentStatusResponse::from(sale)).into_response(),
        Ok(None) => {
            ApiError::from(AppError::NotFound(format!("{} {id}", kind_label(kind)))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub(crate) async fn complete_locally(state: &AppState, kind: SaleKind, id: Uuid) -> Response {
    match state.reconciler.complete_locally(kind, id).await {
        Ok(outcome) => Json(SettlementResponse::new(id, outcome)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

const fn kind_label(kind: SaleKind) -> &'static str {
    match kind {
        SaleKind::Order => "order",
        SaleKind::Pos => "POS transaction",
    }
}

async fn order_payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Response {
    payment_status(&state, SaleKind::Order, order_id).await
}

async fn mark_order_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Response {
    if let Err(e) = auth.require_till_operator() {
        return e.into_response();
    }
    info!(order_id = %order_id, account_id = %auth.account_id(), "Staff marking order paid");
    complete_locally(&state, SaleKind::Order, order_id).await
}
