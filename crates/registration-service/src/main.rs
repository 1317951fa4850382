//! Bill of Lading Registration Service
//!
//! REST API for shipment registration and registration queries

use anyhow::{Context, Result};
use logistics_common::{ledger, HttpInvoker};
use registration_service::{create_router, Config, RegistrationService, SERVICE_NAME};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,registration_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Bill of Lading Registration Service");

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Ledger backend: {:?}", config.ledger_backend);
    info!("  Known services: {:?}", config.service_endpoints.keys());

    let ledger = ledger::connect(config.ledger_backend, &config.redis_url, SERVICE_NAME)
        .await
        .context("Failed to initialize ledger")?;
    let invoker = Arc::new(HttpInvoker::new(config.service_endpoints.clone()));

    let app = create_router(Arc::new(RegistrationService::new(ledger, invoker)));

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Registration Service running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
