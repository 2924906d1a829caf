//! Integration tests for the HTTP intake surface.
//!
//! Requests go through the full axum router (tracing and timeout layers
//! included) into the in-memory store, then the relay drains the outbox.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use payment_outbox::adapters::http::{webhook_router, WebhookAppState};
use payment_outbox::adapters::memory::{InMemoryMessageProducer, InMemoryPaymentStore};
use payment_outbox::adapters::metrics::PrometheusMetricsCollector;
use payment_outbox::application::handlers::ProcessPaymentWebhookHandler;
use payment_outbox::application::workers::OutboxRelay;
use payment_outbox::config::PaymentConfig;
use payment_outbox::domain::payment::{Payment, PaymentProvider, PaymentStatus};
use payment_outbox::domain::webhook::{canonicalize_payos_data, hmac_sha256_hex};
use payment_outbox::ports::PaymentStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

const CHECKSUM_KEY: &str = "http-checksum-key";

async fn setup() -> (Router, Arc<InMemoryPaymentStore>) {
    let store = Arc::new(InMemoryPaymentStore::new());
    for code in ["5001", "5002"] {
        let payment = Payment::new_pending(code, 99_000, "VND", PaymentProvider::PayOs).unwrap();
        store.create(&payment).await.unwrap();
    }

    // Only PayOS is configured, so ZaloPay routes are unknown
    let payment_config = PaymentConfig {
        zalopay_key2: None,
        payos_checksum_key: Some(SecretString::new(CHECKSUM_KEY.into())),
    };
    let state = WebhookAppState {
        webhook_handler: Arc::new(ProcessPaymentWebhookHandler::new(
            payment_config.verifier_registry(),
            store.clone(),
        )),
        metrics: PrometheusMetricsCollector::new("payment-service").unwrap(),
    };
    (webhook_router(state, Duration::from_secs(30)), store)
}

fn payos_body(order_code: u64, code: &str, key: &str) -> String {
    let data = json!({
        "orderCode": order_code,
        "amount": 99000,
        "code": code,
        "desc": "Thành công",
        "reference": format!("REF{}", order_code),
        "transactionDateTime": "2024-05-01 10:00:00",
    });
    let canonical = canonicalize_payos_data(data.as_object().unwrap());
    json!({
        "code": "00",
        "desc": "success",
        "success": true,
        "data": data,
        "signature": hmac_sha256_hex(key.as_bytes(), canonical.as_bytes()),
    })
    .to_string()
}

async fn post(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn payos_callback_flows_through_to_broker() {
    let (app, store) = setup().await;

    let (status, body) = post(app, "/webhooks/payos", payos_body(5001, "00", CHECKSUM_KEY)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    let payment = store.find_by_order_code("5001").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);

    let producer = Arc::new(InMemoryMessageProducer::new());
    let report = OutboxRelay::new(store.clone(), producer.clone())
        .run_pass()
        .await
        .unwrap();
    assert_eq!(report.published, 1);
    let message = &producer.messages()[0];
    assert_eq!(message.topic, "payment.completed");
    assert_eq!(message.key, payment.id.to_string());
}

#[tokio::test]
async fn wrong_key_is_rejected_without_state_change() {
    let (app, store) = setup().await;

    let (status, body) = post(app, "/webhooks/payos", payos_body(5001, "00", "wrong-key")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Invalid signature"}));
    let payment = store.find_by_order_code("5001").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(store.entries().is_empty());
}

#[tokio::test]
async fn malformed_json_is_answered_in_provider_format() {
    let (app, store) = setup().await;

    let (status, body) = post(app, "/webhooks/payos", "{not json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Invalid signature"}));
    assert!(store.entries().is_empty());
}

#[tokio::test]
async fn unconfigured_provider_is_unknown() {
    let (app, _) = setup().await;

    let (status, body) = post(app, "/webhooks/zalopay", "{}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_PROVIDER");
}

#[tokio::test]
async fn each_payment_settles_independently() {
    let (app, store) = setup().await;

    let (s1, _) = post(app.clone(), "/webhooks/payos", payos_body(5001, "00", CHECKSUM_KEY)).await;
    let (s2, _) = post(app, "/webhooks/payos", payos_body(5002, "09", CHECKSUM_KEY)).await;

    assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));
    let first = store.find_by_order_code("5001").await.unwrap().unwrap();
    let second = store.find_by_order_code("5002").await.unwrap().unwrap();
    assert_eq!(first.status, PaymentStatus::Completed);
    assert_eq!(second.status, PaymentStatus::Failed);
    assert_eq!(store.entries().len(), 2);
}

#[tokio::test]
async fn get_on_webhook_route_is_not_allowed() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(Request::builder().uri("/webhooks/payos").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
