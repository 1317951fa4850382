//! Container Logistics Service
//!
//! REST API for container creation, telemetry updates and state queries

use anyhow::{Context, Result};
use container_service::{create_router, Config, ContainerService, SERVICE_NAME};
use logistics_common::{ledger, HttpInvoker};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,container_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Container Logistics Service");

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Ledger backend: {:?}", config.ledger_backend);
    info!("  History retention: {:?}", config.history_retention);
    info!("  Known services: {:?}", config.service_endpoints.keys());

    let ledger = ledger::connect(config.ledger_backend, &config.redis_url, SERVICE_NAME)
        .await
        .context("Failed to initialize ledger")?;
    let invoker = Arc::new(HttpInvoker::new(config.service_endpoints.clone()));

    let service = ContainerService::new(ledger, invoker)
        .with_history_retention(config.history_retention);

    let app = create_router(Arc::new(service));

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Container Logistics Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
