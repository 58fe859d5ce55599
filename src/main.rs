use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod metrics;
mod models;
mod ports;
mod store;
mod utils;

use config::Config;
use domain::order::OrderOrchestrator;
use metrics::Metrics;
use ports::{HttpAccountClient, HttpCatalogClient};
use store::PgOrderStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_service=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order service");

    let config = Config::from_env()?;

    // === 1. Connect to Postgres and bootstrap the order schema ===
    tracing::info!("Connecting to Postgres...");
    let order_store = Arc::new(PgOrderStore::connect(&config.database_url).await?);

    // === 2. Port adapters for the Account and Catalog services ===
    let accounts = Arc::new(HttpAccountClient::new(
        &config.account_service_url,
        config.call_deadline,
    )?);
    let catalog = Arc::new(HttpCatalogClient::new(
        &config.catalog_service_url,
        config.call_deadline,
    )?);
    tracing::info!(
        account_service = %config.account_service_url,
        catalog_service = %config.catalog_service_url,
        "port adapters ready"
    );

    // === 3. Metrics registry ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    // === 4. Orchestrator over the ports and the store ===
    let orchestrator = Arc::new(OrderOrchestrator::new(
        accounts,
        catalog,
        order_store,
        metrics.clone(),
        config.call_deadline,
    ));

    // === 5. Serve ===
    tracing::info!(
        "📦 Serving orders on http://{}:{}",
        config.bind_addr,
        config.bind_port
    );
    api::run_server(
        &config,
        api::AppState {
            orchestrator,
            metrics,
        },
    )
    .await?;

    Ok(())
}
