//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod health;
pub mod orders;
pub mod payments;
pub mod pos;
pub mod wallet;
pub mod webhooks;

/// Creates the API router, wrapping account-scoped routes in the auth layer.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(wallet::routes())
        .merge(pos::routes())
        .merge(orders::staff_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(webhooks::routes())
        .merge(payments::routes())
        .merge(orders::routes())
        .merge(protected_routes)
}
