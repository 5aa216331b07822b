//! End-to-end tests over the router with a scripted grid source.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use grid_source::ModelProduct;
use hazard_api::config::HazardConfig;
use hazard_api::prefetch::run_prefetch_pass;
use hazard_api::state::AppState;
use hazard_cache::{PrefetchStatus, ProductKind};
use test_utils::{colorado_latlon, grid_from_fn, MockFailure, MockGridSource};

fn test_config() -> HazardConfig {
    HazardConfig {
        stride: 1,
        max_fxx: 3,
        ..HazardConfig::default()
    }
}

/// Mock with a plausible gust field at fxx 1 and the cycle probe satisfied.
fn gusty_source() -> MockGridSource {
    let gusts = grid_from_fn(4, 4, |_, i| (i as f32 + 1.0) * 10.0);
    MockGridSource::new(colorado_latlon(4, 4))
        .with_available(ModelProduct::Prs, 0)
        .with_available(ModelProduct::Prs, 1)
        .with_field(ModelProduct::Sfc, 1, "GUST", "10 m above ground", gusts)
}

fn app(source: MockGridSource) -> axum::Router {
    let state = AppState::with_source(test_config(), Arc::new(source)).unwrap();
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle();
    hazard_api::build_router(Arc::new(state), handle)
}

async fn get_json(
    app: &axum::Router,
    uri: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app(gusty_source());
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "hazard-api");
}

#[tokio::test]
async fn test_winds_endpoint_serves_points() {
    let app = app(gusty_source());
    let (status, body) = get_json(&app, "/api/winds?fxx=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "HRRR");
    assert_eq!(body["fxx"], 1);
    assert_eq!(body["point_count"], 16);
    assert_eq!(body["points"][0]["gust_kt"], 19.4);
}

#[tokio::test]
async fn test_winds_fxx_out_of_range_is_400() {
    let app = app(gusty_source());
    let (status, body) = get_json(&app, "/api/winds?fxx=4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fxx"));
}

#[tokio::test]
async fn test_unpublished_hour_is_404() {
    let source = gusty_source().with_failure(ModelProduct::Sfc, 2, MockFailure::NotPublished);
    let app = app(source);
    let (status, body) = get_json(&app, "/api/winds?fxx=2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("published"));
}

#[tokio::test]
async fn test_upstream_failure_is_502() {
    let source = gusty_source().with_failure(ModelProduct::Sfc, 3, MockFailure::Download);
    let app = app(source);
    let (status, _) = get_json(&app, "/api/winds?fxx=3").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_availability_surface() {
    let app = app(gusty_source());
    let (status, body) = get_json(&app, "/api/availability").await;
    assert_eq!(status, StatusCode::OK);
    let top = &body["cycles"][0];
    assert_eq!(top["available_hours"], serde_json::json!([1]));
    assert_eq!(top["total_hours"], 3);
    assert_eq!(top["pct_complete"], 33);
}

#[tokio::test]
async fn test_prefetch_status_starts_pending() {
    let app = app(gusty_source());
    let (status, body) = get_json(&app, "/api/prefetch/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cycle_utc"], serde_json::Value::Null);
    assert_eq!(body["products"]["winds"]["1"], "pending");
}

#[tokio::test]
async fn test_prefetch_pass_marks_outcomes() {
    // Gusts are scripted for fxx 1; the pressure-level file probes available
    // but carries none of the fields froude and virga need, so those two
    // fail hard and land in the error state.
    let state = Arc::new(AppState::with_source(test_config(), Arc::new(gusty_source())).unwrap());

    run_prefetch_pass(&state).await;

    assert_eq!(state.prefetch.get(ProductKind::Winds, 1).await, PrefetchStatus::Ready);
    assert_eq!(state.prefetch.get(ProductKind::Froude, 1).await, PrefetchStatus::Error);
    assert_eq!(state.prefetch.get(ProductKind::Virga, 1).await, PrefetchStatus::Error);
    // Hours the availability sweep never reported stay untouched.
    assert_eq!(state.prefetch.get(ProductKind::Winds, 2).await, PrefetchStatus::Pending);
    assert!(state.prefetch.current_cycle().await.is_some());
}
