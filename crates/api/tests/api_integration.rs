//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cart::InMemoryCartStorage;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::GatewayError;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (
    axum::Router,
    Arc<api::routes::AppState<InMemoryCartStorage>>,
) {
    let config = api::Config::default();
    let (state, _listener) = api::create_default_state(&config);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            builder
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn widget(id: &str, price: f64, quantity: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("Item {id}"),
        "unit_price": price,
        "currency": "eur",
        "quantity": quantity,
        "kind": "product"
    })
}

fn customer() -> serde_json::Value {
    serde_json::json!({
        "email": "ana@example.com",
        "first_name": "Ana",
        "last_name": "García",
        "address": "Calle Mayor 1",
        "postal_code": "28001",
        "city": "Madrid",
        "province": "Madrid",
        "phone": "+34 600 000 000"
    })
}

async fn walk_to_payment(app: &axum::Router) {
    let (status, _) = send(app, "POST", "/cart/items", Some(widget("sku-1", 25.0, 2.0))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(app, "PUT", "/checkout/customer", Some(customer())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        app,
        "POST",
        "/checkout/advance",
        Some(serde_json::json!({ "intent": "next_from_information" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "advance to shipping: {body}");

    let (status, body) = send(
        app,
        "POST",
        "/checkout/advance",
        Some(serde_json::json!({ "intent": "next_from_shipping" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "advance to payment: {body}");
    assert_eq!(body["step"], "payment");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_add_item_returns_cart_with_totals() {
    let (app, _) = setup();

    let (status, json) = send(
        &app,
        "POST",
        "/cart/items",
        Some(widget("sku-1", 10.004, 2.0)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["items"][0]["unit_price_cents"], 1000);
    assert_eq!(json["items"][0]["currency"], "EUR");
    assert_eq!(json["subtotal_cents"], 2000);
    assert_eq!(json["item_count"], 2);
    assert_eq!(json["has_services"], false);
    // 20.00 of 60.00: 40.00 remaining, 33%.
    assert_eq!(json["free_shipping"]["remaining_cents"], 4000);
    assert_eq!(json["free_shipping"]["percent"], 33);
}

#[tokio::test]
async fn test_service_cart_flags_services_and_skips_free_shipping() {
    let (app, _) = setup();

    let (status, json) = send(
        &app,
        "POST",
        "/cart/items",
        Some(serde_json::json!({
            "id": "svc-1",
            "title": "Color Consultation",
            "unit_price": 80.0,
            "kind": "service"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["has_services"], true);
    // Nothing to ship, so there is no free-shipping progress to report.
    assert!(json["free_shipping"].is_null());
}

#[tokio::test]
async fn test_add_item_without_identifier_is_rejected() {
    let (app, _) = setup();

    let (status, _) = send(
        &app,
        "POST",
        "/cart/items",
        Some(serde_json::json!({ "id": "  ", "title": "Ghost" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_add_merges_lines() {
    let (app, _) = setup();

    send(&app, "POST", "/cart/items", Some(widget("sku-1", 10.0, 2.0))).await;
    let (_, json) = send(&app, "POST", "/cart/items", Some(widget("sku-1", 10.0, 3.0))).await;

    assert_eq!(json["items"].as_array().unwrap().len(), 1);
    assert_eq!(json["items"][0]["quantity"], 5);
}

#[tokio::test]
async fn test_increment_unknown_line_is_not_found() {
    let (app, _) = setup();

    let (status, _) = send(&app, "POST", "/cart/items/ghost/increment", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_decrement_to_zero_removes_line() {
    let (app, _) = setup();
    send(&app, "POST", "/cart/items", Some(widget("sku-1", 10.0, 1.0))).await;

    let (status, json) = send(&app, "POST", "/cart/items/sku-1/decrement", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_advance_with_incomplete_form_maps_to_422() {
    let (app, _) = setup();
    send(&app, "POST", "/cart/items", Some(widget("sku-1", 10.0, 1.0))).await;

    let (status, json) = send(
        &app,
        "POST",
        "/checkout/advance",
        Some(serde_json::json!({ "intent": "next_from_information" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["key"], "completeRequiredFields");
}

#[tokio::test]
async fn test_advance_with_empty_cart_maps_to_422() {
    let (app, _) = setup();

    let (status, _) = send(&app, "PUT", "/checkout/customer", Some(customer())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(
        &app,
        "POST",
        "/checkout/advance",
        Some(serde_json::json!({ "intent": "next_from_information" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["key"], "cartEmptyError");
}

#[tokio::test]
async fn test_full_walk_exposes_session() {
    let (app, _) = setup();
    walk_to_payment(&app).await;

    let (status, json) = send(&app, "GET", "/checkout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["step"], "payment");
    assert!(json["session"]["client_secret"].as_str().is_some());
    assert!(json["session"]["order_number"].as_str().is_some());
}

#[tokio::test]
async fn test_stock_conflict_maps_to_409_without_gateway_detail() {
    let (app, state) = setup();
    state
        .gateway
        .set_fail_on_create(Some(GatewayError::InsufficientStock {
            available: 1,
            requested: 2,
            message: Some("stock row contention".to_string()),
        }));

    send(&app, "POST", "/cart/items", Some(widget("sku-1", 25.0, 2.0))).await;
    send(&app, "PUT", "/checkout/customer", Some(customer())).await;
    send(
        &app,
        "POST",
        "/checkout/advance",
        Some(serde_json::json!({ "intent": "next_from_information" })),
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        "/checkout/advance",
        Some(serde_json::json!({ "intent": "next_from_shipping" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["key"], "insufficientStock");
    // Server-side detail never reaches the client.
    assert!(!json["error"].as_str().unwrap().contains("contention"));
}

#[tokio::test]
async fn test_complete_order_clears_cart() {
    let (app, _) = setup();
    walk_to_payment(&app).await;

    let (status, json) = send(
        &app,
        "POST",
        "/checkout/complete",
        Some(serde_json::json!({ "payment_intent_id": "pi_123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "completed");

    let (_, cart) = send(&app, "GET", "/cart", None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let (_, checkout_state) = send(&app, "GET", "/checkout", None).await;
    assert_eq!(checkout_state["step"], "information");
}

#[tokio::test]
async fn test_complete_without_session_is_rejected() {
    let (app, _) = setup();

    let (status, _) = send(
        &app,
        "POST",
        "/checkout/complete",
        Some(serde_json::json!({ "payment_intent_id": "pi_123" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_selecting_unknown_shipping_option_is_not_found() {
    let (app, _) = setup();

    let (status, _) = send(
        &app,
        "PUT",
        "/checkout/shipping-option",
        Some(serde_json::json!({ "id": "drone" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
