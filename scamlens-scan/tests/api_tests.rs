//! Integration tests for the HTTP surface.
//!
//! Remote collaborators are pointed at a closed loopback port so their
//! calls fail immediately; the tests exercise the degraded-but-well-formed
//! response guarantees end to end.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use scamlens_common::config::{AppConfig, ProviderEndpoint};
use scamlens_scan::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Config whose remote collaborators are all unreachable (closed port).
fn offline_config() -> AppConfig {
    let mut config = AppConfig::default();
    let dead = |timeout| ProviderEndpoint::new("http://127.0.0.1:9/unreachable", timeout);
    config.providers.visual_judge = dead(5);
    config.providers.brand_matcher = dead(5);
    config.providers.ml_classifier = dead(5);
    for endpoint in config.providers.reputation.values_mut() {
        *endpoint = dead(5);
    }
    config
}

fn app() -> axum::Router {
    build_router(AppState::new(offline_config()))
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_module_and_uptime() {
    let app = app();
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "scamlens-scan");
    assert!(body["uptime_seconds"].is_u64());
    assert!(body["reputation_providers"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn analyze_requires_url_or_screenshot() {
    let app = app();
    let (status, body) = post_json(&app, "/analyze", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn analyze_rejects_invalid_base64_screenshot() {
    let app = app();
    let (status, _) = post_json(
        &app,
        "/analyze",
        json!({"screenshot": "!!! not base64 !!!"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn screenshot_only_total_outage_returns_conservative_fallback() {
    let app = app();
    // Valid base64, but every collaborator that could use it is
    // unreachable and the heuristics have no URL to work with.
    let (status, body) = post_json(
        &app,
        "/analyze",
        json!({"screenshot": "aGVsbG8gd29ybGQ="}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decision"], "suspicious");
    assert_eq!(body["score"], 50.0);
    assert_eq!(body["consensus"], "error");
    assert!(!body["errors"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn url_analysis_degrades_to_heuristics_only() {
    let app = app();
    let (status, body) = post_json(
        &app,
        "/analyze",
        json!({"url": "https://example.com/welcome"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // Heuristics found nothing suspicious about the URL itself
    assert_eq!(body["decision"], "clean");
    assert_eq!(body["consensus"], "high");
    // The three remote collaborators are reported as failed
    assert_eq!(body["errors"].as_object().unwrap().len(), 3);
    assert!(body["breakdown"]["url_heuristics"].is_number());
}

#[tokio::test]
async fn phone_report_round_trip() {
    let app = app();

    let (status, first) = post_json(
        &app,
        "/phone/report",
        json!({"number": "+1 (555) 123-4567", "comment": "robocall"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["total"], 1);
    assert_eq!(first["report"]["subject"], "+15551234567");

    let (status, second) = post_json(
        &app,
        "/phone/report",
        json!({"number": "+15551234567"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["total"], 2);

    let (status, reports) = get_json(&app, "/phone/reports/+15551234567").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reports["count"], 2);
    assert_eq!(reports["recent"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn phone_analyze_rejects_invalid_number() {
    let app = app();
    let (status, _) = post_json(&app, "/phone/analyze", json!({"number": "bogus"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn phone_analysis_survives_provider_outage() {
    let app = app();
    let (status, body) =
        post_json(&app, "/phone/analyze", json!({"number": "+15551234567"})).await;

    assert_eq!(status, StatusCode::OK);
    // Only the report store answered, and it has no reports
    assert_eq!(body["decision"], "appears_safe");
    assert_eq!(body["reports"], 0);
    assert_eq!(body["errors"].as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn reported_number_scores_higher() {
    let app = app();

    for _ in 0..12 {
        let (status, _) = post_json(
            &app,
            "/phone/report",
            json!({"number": "+15559876543", "comment": "scam"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) =
        post_json(&app, "/phone/analyze", json!({"number": "+15559876543"})).await;

    assert_eq!(status, StatusCode::OK);
    // 12 reports put the user_reports signal at risk 60; it is the only
    // available source, so the verdict follows it
    assert_eq!(body["reports"], 12);
    assert_eq!(body["decision"], "suspicious");
    assert!(body["score"].as_f64().unwrap() >= 40.0);
}
