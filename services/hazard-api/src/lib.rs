//! Hazard products API service.
//!
//! Serves the three HRRR-derived hazard products plus availability,
//! prefetch-status and METAR passthrough endpoints.

pub mod config;
pub mod handlers;
pub mod metar;
pub mod prefetch;
pub mod state;

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;

use state::AppState;

pub fn build_router(state: Arc<AppState>, prometheus_handle: PrometheusHandle) -> Router {
    use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .route("/api/winds", get(handlers::winds_handler))
        .route("/api/froude", get(handlers::froude_handler))
        .route("/api/virga", get(handlers::virga_handler))
        .route("/api/availability", get(handlers::availability_handler))
        .route("/api/prefetch/status", get(handlers::prefetch_status_handler))
        .route("/api/metar", get(handlers::metar_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(Extension(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
