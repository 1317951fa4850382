//! Container Logistics Service
//!
//! Tracks the telemetry state of containers attached to a registered Bill of
//! Lading. Partial sensor updates are merged into the stored state, checked
//! against the shipment's thresholds and logged; violations are reported to
//! the compliance service before anything is written.

pub mod config;
pub mod context;
pub mod history;
pub mod service;

use axum::Router;
use logistics_common::api::{self, AppState};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use context::ShipmentContext;
pub use history::HistoryRetention;
pub use service::{ContainerService, UpdateOutcome, SERVICE_NAME};

/// Create the application router
pub fn create_router(service: Arc<ContainerService>) -> Router {
    api::create_router(AppState::new(service))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
