//! API Layer - patient REST endpoints plus health probe
//!
//! Exposes the patient store over HTTP

pub mod error;
pub mod middleware;
pub mod rest;

use std::sync::Arc;
use std::time::Duration;
use axum::{Router, routing::get};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;

use crate::store::PatientStore;

pub use error::ApiError;

/// Create the main API router
pub fn router(store: Arc<PatientStore>, request_timeout: Duration) -> Router {
    let patient_state = rest::PatientApiState::new(store);

    Router::new()
        .route("/health", get(health_check))
        .merge(rest::routes(patient_state))
        // Timeout Layer (prevents runaway requests)
        .layer(axum::middleware::from_fn_with_state(
            request_timeout,
            middleware::timeout_middleware,
        ))
        // Request ID tracking (for debugging and audit)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
}

async fn health_check() -> &'static str {
    "OK"
}
