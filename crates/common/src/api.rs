//! HTTP surface shared by the logistics services
//!
//! Every service exposes `POST /api/init` and `POST /api/{function}`; the
//! request body is the single JSON argument of the operation.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Error;
use crate::invoke::ContractService;

/// Shared application state
pub struct AppState {
    pub service: Arc<dyn ContractService>,
    /// Serializes operations so each one runs alone against the ledger
    pub gate: Mutex<()>,
}

impl AppState {
    pub fn new(service: Arc<dyn ContractService>) -> Self {
        Self {
            service,
            gate: Mutex::new(()),
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) | Error::NotRegistered(_) => StatusCode::NOT_FOUND,
            Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::DependencyInvocation { .. } => StatusCode::BAD_GATEWAY,
            Error::PartiallyApplied { .. } | Error::LedgerIo(_) | Error::Uninitialized(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        ApiError {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.service.name()
    }))
}

/// Contract initialization
pub async fn init_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let _guard = state.gate.lock().await;
    state.service.init(&body).await.map_err(|e| {
        warn!("Init of {} rejected: {}", state.service.name(), e);
        ApiError::from(e)
    })?;

    info!("{} initialized", state.service.name());
    Ok(StatusCode::NO_CONTENT)
}

/// Run a named operation
pub async fn invoke_handler(
    State(state): State<Arc<AppState>>,
    Path(function): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let _guard = state.gate.lock().await;
    let reply = state
        .service
        .invoke(&function, &[body.to_vec()])
        .await
        .map_err(|e| {
            warn!("{} failed: {}", function, e);
            ApiError::from(e)
        })?;

    if reply.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(([(header::CONTENT_TYPE, "application/json")], reply).into_response())
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/init", post(init_handler))
        .route("/api/{function}", post(invoke_handler))
        .with_state(shared_state)
}
