//! HTTP API tests
//!
//! Requests are sent straight to the router, with all security layers in
//! place, without binding a socket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bid_matcher::catalog::store::{CatalogSnapshot, CatalogStore, InMemoryCatalog, JsonFileCatalog};
use bid_matcher::pipeline::extraction::default_requirements;
use bid_matcher::web::server::{create_router_with_state, AppState, MAX_TENDER_CANDIDATES};
use serde_json::{json, Value};
use tower::ServiceExt;

const SCOPE: &str = "\
Item 1: Armored Power Cable \u{2014} Voltage 1.1 kV, Conductor Copper, Insulation XLPE, Armor Steel Wire.
Item 2: Armored Power Cable \u{2014} Voltage 1.1 kV, Conductor Aluminium, Insulation XLPE, Armor Steel Wire.
";

fn router_with(catalog: Arc<dyn CatalogStore>) -> Router {
    create_router_with_state(Arc::new(AppState { catalog })).unwrap()
}

fn router() -> Router {
    router_with(Arc::new(InMemoryCatalog::new(
        CatalogSnapshot::load_embedded().unwrap(),
    )))
}

fn request(method: Method, uri: &str, body: Option<String>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let mut request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    // The rate limiter keys on the peer address
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40_000))));
    request
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(router: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    send(router, request(Method::POST, uri, Some(body.to_string()))).await
}

#[tokio::test]
async fn test_liveness_and_security_headers() {
    let response = router()
        .oneshot(request(Method::GET, "/", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_catalog_listing() {
    let (status, body) = send(router(), request(Method::GET, "/api/catalog", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], body["products"].as_array().unwrap().len());
    assert_eq!(body["test_cost_per_item"], 650.0);
}

#[tokio::test]
async fn test_catalog_unavailable() {
    let router = router_with(Arc::new(JsonFileCatalog::new("/nonexistent/catalog.json")));
    let (status, body) = send(router, request(Method::GET, "/api/catalog", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "catalog_unavailable");
    assert!(body["details"].is_null());
}

#[tokio::test]
async fn test_price_completed() {
    let (status, body) = post_json(router(), "/api/price", &default_requirements()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["items"][0]["recommended_sku"], "SKU-CU-XLPE-SWA");
    assert_eq!(body["items"][0]["total_cost"], 1750.0);
    assert_eq!(body["items"][1]["recommended_sku"], "SKU-AL-XLPE-SWA");
    assert_eq!(body["items"][1]["total_cost"], 1700.0);
}

#[tokio::test]
async fn test_price_threshold_parameters() {
    let requirements = json!([{"VoltageRating": "1.1 kV", "ConductorMaterial": "Copper", "InsulationType": "PVC", "ArmorType": "None"}]);

    let (_, body) = post_json(router(), "/api/price?min_score=80", &requirements).await;
    assert!(body["items"][0]["recommended_sku"].is_null());

    let (_, body) = post_json(router(), "/api/price?min_score=75&inclusive=true", &requirements).await;
    assert_eq!(body["items"][0]["recommended_sku"], "SKU-CU-PVC-STA");

    let (status, body) = post_json(router(), "/api/price?min_score=150", &requirements).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_parameter");
}

#[tokio::test]
async fn test_price_malformed_requirements() {
    let (status, body) = post_json(router(), "/api/price", &json!({"VoltageRating": "1.1 kV"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "technical_analysis_failed"}));
}

#[tokio::test]
async fn test_price_invalid_json_body() {
    let (status, body) = send(
        router(),
        request(Method::POST, "/api/price", Some("not json".to_string())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_json");
}

#[tokio::test]
async fn test_price_unreadable_catalog() {
    let router = router_with(Arc::new(JsonFileCatalog::new("/nonexistent/catalog.json")));
    let (status, body) = post_json(router, "/api/price", &default_requirements()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "pricing_failed"}));
}

#[tokio::test]
async fn test_select_tender() {
    let listing = json!({
        "today": "2025-10-13",
        "tenders": [
            {"title": "Expired", "due_date": "2025-10-01"},
            {"title": "Unparseable", "due_date": "next month"},
            {"title": "Metro cabling", "due_date": "2025-11-15"},
        ]
    });
    let (status, body) = post_json(router(), "/api/tenders/select", &listing).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "selected");
    assert_eq!(body["tender"]["title"], "Metro cabling");

    let listing = json!({"today": "2025-10-13", "window_days": 10, "tenders": [{"title": "Metro cabling", "due_date": "2025-11-15"}]});
    let (_, body) = post_json(router(), "/api/tenders/select", &listing).await;
    assert_eq!(body, json!({"status": "no_tenders_found"}));
}

#[tokio::test]
async fn test_select_tender_bad_date_parameter() {
    let listing = json!({"today": "13/10/2025", "tenders": []});
    let (status, body) = post_json(router(), "/api/tenders/select", &listing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_parameter");
}

#[tokio::test]
async fn test_too_many_tenders_rejected() {
    let tenders: Vec<Value> = (0..=MAX_TENDER_CANDIDATES)
        .map(|i| json!({"title": format!("Tender {i}"), "due_date": "2025-11-15"}))
        .collect();
    let (status, _) = post_json(router(), "/api/tenders/select", &json!({ "tenders": tenders })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_analysis_run() {
    let listing = json!({
        "today": "2025-10-13",
        "document": SCOPE,
        "tenders": [{"title": "Metro cabling", "due_date": "2025-11-15", "organization": "Metro Rail"}]
    });
    let (status, body) = post_json(router(), "/api/analysis/run", &listing).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["tender"]["organization"], "Metro Rail");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_analysis_statuses() {
    let no_tender = json!({"today": "2025-10-13", "tenders": []});
    let (_, body) = post_json(router(), "/api/analysis/run", &no_tender).await;
    assert_eq!(body["status"], "no_tenders_found");

    let no_scope = json!({"today": "2025-10-13", "tenders": [{"title": "Cabling", "due_date": "2025-11-15"}]});
    let (_, body) = post_json(router(), "/api/analysis/run", &no_scope).await;
    assert_eq!(body["status"], "technical_analysis_failed");

    let with_fallback = json!({"today": "2025-10-13", "fallback": true, "tenders": [{"title": "Cabling", "due_date": "2025-11-15"}]});
    let (_, body) = post_json(router(), "/api/analysis/run", &with_fallback).await;
    assert_eq!(body["status"], "completed");
}
