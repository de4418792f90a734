//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The gateway webhook and redirect-callback endpoints
//! - Order, POS and wallet routes
//! - Authentication middleware
//! - JSON error rendering

pub mod error;
pub mod middleware;
pub mod routes;


use axum::Router;
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use storeledger_core::gateway::PaymentGateway;
use storeledger_core::reconcile::Reconciler;
use storeledger_core::sale::CheckoutService;
use storeledger_core::store::{InventoryStore, LedgerStore, SaleStore};
use storeledger_core::wallet::WalletService;
use storeledger_db::{LedgerRepository, ProductRepository, SaleRepository};
use storeledger_shared::types::{Currency, MoneyError};
use storeledger_shared::{AppConfig, JwtService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Settlement state machine.
    pub reconciler: Reconciler,
    /// Order and POS initiation.
    pub checkout: CheckoutService,
    /// Wallet funding and withdrawals.
    pub wallets: WalletService,
    /// Read access to sales for status polling.
    pub sales: Arc<dyn SaleStore>,
    /// Settlement currency.
    pub currency: Currency,
    /// SHA-256 of the webhook secret, when one is configured.
    webhook_secret_hash: Option<[u8; 32]>,
}

impl AppState {
    /// Wires the services over the given stores and gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured currency is not supported.
    pub fn new(
        config: AppConfig,
        sales: Arc<dyn SaleStore>,
        ledger: Arc<dyn LedgerStore>,
        inventory: Arc<dyn InventoryStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, MoneyError> {
        let currency: Currency = config.gateway.currency.parse()?;

        let webhook_secret_hash: Option<[u8; 32]> = config
            .gateway
            .webhook_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| Sha256::digest(s.as_bytes()).into());
        if webhook_secret_hash.is_none() {
            warn!("No webhook secret configured; gateway webhooks will not be authenticated");
        }

        let reconciler = Reconciler::new(
            Arc::clone(&sales),
            Arc::clone(&ledger),
            Arc::clone(&inventory),
            Arc::clone(&gateway),
        );
        let checkout = CheckoutService::new(
            Arc::clone(&sales),
            inventory,
            Arc::clone(&gateway),
            reconciler.clone(),
            currency,
        );
        let wallets = WalletService::new(ledger, gateway);

        Ok(Self {
            jwt_service: Arc::new(JwtService::new(&config.jwt.secret)),
            config: Arc::new(config),
            reconciler,
            checkout,
            wallets,
            sales,
            currency,
            webhook_secret_hash,
        })
    }

    /// Wires the services over the SeaORM repositories.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured currency is not supported.
    pub fn with_database(
        config: AppConfig,
        db: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, MoneyError> {
        Self::new(
            config,
            Arc::new(SaleRepository::new(db.clone())),
            Arc::new(LedgerRepository::new(db.clone())),
            Arc::new(ProductRepository::new(db)),
            gateway,
        )
    }

    /// Checks a `verif-hash` header value against the configured secret.
    ///
    /// Always true when no secret is configured.
    #[must_use]
    pub fn webhook_signature_matches(&self, provided: Option<&str>) -> bool {
        let Some(expected) = self.webhook_secret_hash else {
            return true;
        };
        provided.is_some_and(|value| {
            let digest: [u8; 32] = Sha256::digest(value.as_bytes()).into();
            digest == expected
        })
    }

    /// Returns true if webhooks are authenticated.
    #[must_use]
    pub const fn webhook_secret_configured(&self) -> bool {
        self.webhook_secret_hash.is_some()
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
