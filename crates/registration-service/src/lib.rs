//! Bill of Lading Registration Service
//!
//! Registers a shipment's contractual terms. Registration creates the
//! shipment's containers in the container service and seeds a compliant
//! record in the compliance service before the terms are stored.

pub mod config;
pub mod saga;
pub mod service;

use axum::Router;
use logistics_common::api::{self, AppState};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use saga::{RegistrationStep, SagaRecord, SagaStatus};
pub use service::{RegistrationService, SERVICE_NAME};

/// Create the application router
pub fn create_router(service: Arc<RegistrationService>) -> Router {
    api::create_router(AppState::new(service))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
