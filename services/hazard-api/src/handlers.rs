//! HTTP handlers.

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tracing::error;

use hazard_cache::CacheKey;
use hazard_products::ProductError;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub fxx: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct MetarQuery {
    pub ids: Option<String>,
}

const DEFAULT_METAR_IDS: &str = "KDEN,KBJC,KAPA,KCOS,KEGE,KASE";

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Map a product failure onto an HTTP status. The error text carries the
/// full chain; this is an ops tool, not a public surface.
fn product_error_response(product: &'static str, err: ProductError) -> Response {
    counter!("hazard_product_errors_total", "product" => product).increment(1);
    if err.is_not_published() {
        return json_error(StatusCode::NOT_FOUND, err.to_string());
    }
    if err.is_upstream() {
        return json_error(StatusCode::BAD_GATEWAY, err.to_string());
    }
    error!(product, error = %err, "product computation failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// Validate fxx and resolve the cycle the request targets.
async fn request_key(
    state: &AppState,
    query: &ProductQuery,
) -> Result<CacheKey, Response> {
    let fxx = query.fxx.unwrap_or(1);
    if fxx > state.config.max_fxx {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            format!("fxx must be 0..={}", state.config.max_fxx),
        ));
    }
    Ok(CacheKey {
        cycle: state.availability.latest_cycle().await,
        fxx,
    })
}

pub async fn winds_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Response {
    counter!("hazard_product_requests_total", "product" => "winds").increment(1);
    let key = match request_key(&state, &query).await {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    let result = state
        .gust_cache
        .get_or_compute(key, state.product_ttl(), || {
            state.gust.compute(key.cycle, key.fxx)
        })
        .await;
    match result {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => product_error_response("winds", err),
    }
}

pub async fn froude_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Response {
    counter!("hazard_product_requests_total", "product" => "froude").increment(1);
    let key = match request_key(&state, &query).await {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    let result = state
        .froude_cache
        .get_or_compute(key, state.product_ttl(), || {
            state.froude.compute(key.cycle, key.fxx)
        })
        .await;
    match result {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => product_error_response("froude", err),
    }
}

pub async fn virga_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Response {
    counter!("hazard_product_requests_total", "product" => "virga").increment(1);
    let key = match request_key(&state, &query).await {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    let result = state
        .virga_cache
        .get_or_compute(key, state.product_ttl(), || {
            state.virga.compute(key.cycle, key.fxx)
        })
        .await;
    match result {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => product_error_response("virga", err),
    }
}

pub async fn availability_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.availability.status().await)
}

pub async fn prefetch_status_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.prefetch.snapshot().await)
}

pub async fn metar_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<MetarQuery>,
) -> Response {
    let ids = query.ids.as_deref().unwrap_or(DEFAULT_METAR_IDS);
    match state.metar.fetch(ids).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => json_error(StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "hazard-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics_handler(
    Extension(handle): Extension<PrometheusHandle>,
) -> impl IntoResponse {
    handle.render()
}
