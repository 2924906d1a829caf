//! Axum router configuration for the intake service.

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    routing::{get, post},
    Router,
};
use http::HeaderName;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{handle_middleware_error, health, metrics, receive_webhook, WebhookAppState};

/// Create the intake router.
///
/// # Routes
/// - `POST /webhooks/*path` - Provider callbacks, provider picked from the path
/// - `GET /health` - Liveness probe
/// - `GET /metrics` - Prometheus metrics
///
/// Every request gets an `x-request-id` (kept if the caller sent one), is
/// traced, and is bounded by `request_timeout`.
pub fn webhook_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/webhooks/*path", post(receive_webhook))
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    with_intake_layers(routes, request_timeout).with_state(state)
}

/// Timeout answered as a 500 JSON body, then request id and tracing.
fn with_intake_layers<S>(router: Router<S>, request_timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let request_id = HeaderName::from_static("x-request-id");

    router
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout),
        )
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::adapters::metrics::PrometheusMetricsCollector;
    use crate::application::handlers::ProcessPaymentWebhookHandler;
    use crate::domain::payment::{Payment, PaymentProvider, PaymentStatus};
    use crate::domain::webhook::{hmac_sha256_hex, VerifierRegistry, ZaloPayVerifier};
    use crate::ports::{MetricsCollector, PaymentStore, EVENTS_DELETED};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const KEY2: &str = "router-test-key2";

    async fn app() -> (Router, Arc<InMemoryPaymentStore>, PrometheusMetricsCollector) {
        let store = Arc::new(InMemoryPaymentStore::new());
        let payment = Payment::new_pending("ORD-1001", 200_000, "VND", PaymentProvider::ZaloPay).unwrap();
        store.create(&payment).await.unwrap();

        let verifiers =
            VerifierRegistry::new().with(ZaloPayVerifier::new(SecretString::new(KEY2.into())));
        let metrics = PrometheusMetricsCollector::new("payment-service").unwrap();
        let state = WebhookAppState {
            webhook_handler: Arc::new(ProcessPaymentWebhookHandler::new(verifiers, store.clone())),
            metrics: metrics.clone(),
        };
        (webhook_router(state, Duration::from_secs(30)), store, metrics)
    }

    fn signed_zalopay_body(order_code: &str) -> String {
        let data = json!({"app_trans_id": format!("240501_{}", order_code), "zp_trans_id": 42}).to_string();
        json!({"data": data, "mac": hmac_sha256_hex(KEY2.as_bytes(), data.as_bytes()), "type": 1})
            .to_string()
    }

    fn post(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn authentic_callback_returns_provider_ack() {
        let (app, store, _) = app().await;

        let response = app
            .oneshot(post("/webhooks/zalopay", signed_zalopay_body("ORD-1001")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"return_code": 1, "return_message": "success"})
        );
        let payment = store.find_by_order_code("ORD-1001").await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn provider_segment_is_case_insensitive() {
        let (app, _, _) = app().await;

        let response = app
            .oneshot(post("/webhooks/v2/ZaloPay/callback", signed_zalopay_body("ORD-1001")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_provider_is_bad_request() {
        let (app, _, _) = app().await;

        let response = app
            .oneshot(post("/webhooks/stripe", "{}".into()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "UNKNOWN_PROVIDER");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn invalid_mac_is_acknowledged_with_rejection_body() {
        let (app, store, _) = app().await;
        let body = json!({"data": "{}", "mac": "deadbeef"}).to_string();

        let response = app.oneshot(post("/webhooks/zalopay", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["return_code"], -1);
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn unknown_order_is_server_error() {
        let (app, _, _) = app().await;

        let response = app
            .oneshot(post("/webhooks/zalopay", signed_zalopay_body("ORD-404")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["code"], "PAYMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn request_past_deadline_is_internal_error_with_json_body() {
        let slow = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let app = with_intake_layers(slow, Duration::from_millis(20));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/slow")
                    .header("x-request-id", "req-slow")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-request-id"], "req-slow");
        assert_eq!(
            json_body(response).await,
            json!({"error": "Request timed out", "code": "TIMEOUT"})
        );
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (app, _, _) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _, _) = app().await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn metrics_expose_counters() {
        let (app, _, metrics) = app().await;
        metrics.record_counter(EVENTS_DELETED, 3).await.unwrap();

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("outbox_events_deleted_total{service=\"payment-service\"} 3"));
    }
}
