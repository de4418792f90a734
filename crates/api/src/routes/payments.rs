//! Browser redirect callback from the hosted checkout.
//!
//! The query string is attacker controlled. The `status` it carries is never
//! used to settle anything; when a `transaction_id` is present the charge is
//! re-verified with the gateway and only the verified outcome is applied.
//! Every path ends in a `303` to a storefront page.

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use serde::Deserialize;
use tracing::{info, warn};

use storeledger_core::reconcile::{SettlementState, SettlementTarget};
use storeledger_core::sale::SaleKind;
use storeledger_shared::config::PublicUrlsConfig;

use crate::AppState;

/// Creates the callback routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/payments/callback", get(payment_callback))
}

/// Query parameters appended by the gateway.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Client-reported status. Display only.
    #[serde(default)]
    pub status: Option<String>,
    /// Our payment reference.
    #[serde(default)]
    pub tx_ref: Option<String>,
    /// Gateway transaction id, present once a charge was attempted.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let urls = &state.config.app;

    let Some(tx_ref) = query.tx_ref.as_deref().filter(|s| !s.is_empty()) else {
        warn!("Payment callback without tx_ref");
        return error_redirect(urls);
    };
    let transaction_id = query.transaction_id.as_deref().filter(|s| !s.is_empty());

    let result = match transaction_id {
        Some(id) => state.reconciler.verify_and_process(tx_ref, id).await,
        None => state.reconciler.current_state(tx_ref).await,
    };

    match result {
        Ok(outcome) => {
            let shown = match outcome.state {
                // Nothing was verified; reflect an abandoned checkout without recording it.
                SettlementState::Pending
                    if transaction_id.is_none()
                        && query
                            .status
                            .as_deref()
                            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled")) =>
                {
                    "cancelled"
                }
                settled => indicator(settled),
            };
            info!(
                reference = tx_ref,
                state = ?outcome.state,
                applied = outcome.applied,
                "Payment callback handled"
            );
            status_redirect(urls, outcome.target, shown)
        }
        Err(e) if e.is_retryable() => {
            warn!(reference = tx_ref, error = %e, "Could not verify payment; reporting pending");
            match state.reconciler.current_state(tx_ref).await {
                Ok(outcome) => status_redirect(urls, outcome.target, "pending"),
                Err(lookup) => {
                    warn!(reference = tx_ref, error = %lookup, "Payment callback lookup failed");
                    error_redirect(urls)
                }
            }
        }
        Err(e) => {
            warn!(reference = tx_ref, code = e.error_code(), error = %e, "Payment callback failed");
            error_redirect(urls)
        }
    }
}

const fn indicator(state: SettlementState) -> &'static str {
    match state {
        SettlementState::Succeeded => "success",
        SettlementState::Failed | SettlementState::Reversed => "failed",
        SettlementState::Cancelled => "cancelled",
        SettlementState::Pending => "pending",
    }
}

fn status_path(target: SettlementTarget, indicator: &str) -> String {
    match target {
        SettlementTarget::Sale {
            kind: SaleKind::Order,
            id,
        } => format!("orders/{id}?payment={indicator}"),
        SettlementTarget::Sale {
            kind: SaleKind::Pos,
            id,
        } => format!("pos/receipt/{id}?payment={indicator}"),
        SettlementTarget::Ledger { .. } => format!("wallet?payment={indicator}"),
    }
}

fn status_redirect(urls: &PublicUrlsConfig, target: SettlementTarget, indicator: &str) -> Redirect {
    Redirect::to(&urls.frontend(&status_path(target, indicator)))
}

fn error_redirect(urls: &PublicUrlsConfig) -> Redirect {
    Redirect::to(&urls.frontend("payment/error"))
}
