//! Storeledger API server.
//!
//! Main entry point for the wallet ledger and payment settlement service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use storeledger_api::{AppState, create_router};
use storeledger_db::connect_with;
use storeledger_gateway::FlutterwaveClient;
use storeledger_shared::AppConfig;
use storeledger_shared::config::LogFormat;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storeledger=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(config.logging.format);

    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let gateway = FlutterwaveClient::from_config(&config.gateway)
        .context("Failed to build payment gateway client")?;
    info!(
        base_url = %config.gateway.base_url,
        currency = %config.gateway.currency,
        "Payment gateway configured"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::with_database(config, db, Arc::new(gateway))
        .context("Invalid settlement currency")?;

    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
