//! Wallet routes for the authenticated account.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use storeledger_core::sale::Customer;
use storeledger_core::wallet::{WithdrawalRequest, WithdrawalState};
use storeledger_shared::types::{AccountId, PageRequest, PageResponse};

use crate::error::ApiError;
use crate::{AppState, middleware::AuthUser};

/// Creates the wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/transactions", get(list_transactions))
        .route("/wallet/fund", post(fund_wallet))
        .route("/wallet/withdraw", post(withdraw))
}

/// Request body for a wallet top-up.
#[derive(Debug, Deserialize)]
pub struct FundWalletRequest {
    /// Amount to add.
    pub amount: Decimal,
    /// Payer details for the hosted checkout.
    #[serde(default)]
    pub customer: Option<Customer>,
}

/// Request body for a payout to a bank account.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Amount to withdraw.
    pub amount: Decimal,
    /// Destination account number.
    pub account_number: String,
    /// Destination bank code.
    pub bank_code: String,
}

/// The gateway requires a payer email; accounts without one get a stable alias.
fn account_customer(account_id: AccountId) -> Customer {
    Customer {
        email: format!("wallet-{}@storeledger.local", account_id.to_simple()),
        name: None,
        phone: None,
    }
}

async fn get_wallet(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.wallets.wallet(auth.account_id(), state.currency).await {
        Ok(wallet) => Json(wallet).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageRequest>,
) -> Response {
    match state
        .wallets
        .history(auth.account_id(), state.currency, &page)
        .await
    {
        Ok((transactions, total)) => {
            Json(PageResponse::new(transactions, &page, total)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn fund_wallet(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<FundWalletRequest>,
) -> Response {
    let account_id = auth.account_id();
    let customer = payload
        .customer
        .unwrap_or_else(|| account_customer(account_id));

    match state
        .wallets
        .fund(
            account_id,
            state.currency,
            payload.amount,
            customer,
            state.config.app.callback_url(),
        )
        .await
    {
        Ok(initiated) => (StatusCode::CREATED, Json(initiated)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<WithdrawRequest>,
) -> Response {
    let request = WithdrawalRequest {
        amount: payload.amount,
        account_number: payload.account_number,
        bank_code: payload.bank_code,
        callback_url: state.config.app.webhook_url(),
    };

    match state
        .wallets
        .withdraw(auth.account_id(), state.currency, request)
        .await
    {
        Ok(initiated) => {
            info!(
                reference = %initiated.transaction.reference,
                state = ?initiated.state,
                "Withdrawal initiated"
            );
            let status = match initiated.state {
                WithdrawalState::Submitted => StatusCode::CREATED,
                WithdrawalState::Pending => StatusCode::ACCEPTED,
            };
            (status, Json(initiated)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
