//! HTTP handlers for provider callbacks and operational endpoints.
//!
//! These handlers connect Axum routes to the webhook command handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::BoxError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::metrics::PrometheusMetricsCollector;
use crate::application::handlers::{ProcessPaymentWebhookCommand, ProcessPaymentWebhookHandler};
use crate::domain::payment::PaymentProvider;
use crate::domain::webhook::WebhookError;

use super::dto::{ErrorResponse, HealthResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the intake router.
#[derive(Clone)]
pub struct WebhookAppState {
    pub webhook_handler: Arc<ProcessPaymentWebhookHandler>,
    pub metrics: PrometheusMetricsCollector,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Wrapper so `WebhookError` can be returned from handlers.
pub struct WebhookApiError(pub WebhookError);

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, retryable = self.0.is_retryable(), "Webhook processing failed");
        } else {
            tracing::warn!(error = %self.0, "Webhook rejected");
        }
        (status, Json(ErrorResponse::from_webhook_error(&self.0))).into_response()
    }
}

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

/// Turns errors from the middleware stack into a 500 JSON body.
///
/// A request that outlives the intake deadline is an internal failure, so the
/// provider retries it like any other.
pub async fn handle_middleware_error(err: BoxError) -> Response {
    let body = if err.is::<tower::timeout::error::Elapsed>() {
        tracing::error!("Request exceeded the intake deadline");
        ErrorResponse::new("TIMEOUT", "Request timed out")
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ErrorResponse::new("INTERNAL_ERROR", "Internal server error")
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/*path - Receive a provider callback.
///
/// The provider is picked from the path. Authenticated or not, a callback the
/// handler acknowledges gets HTTP 200 with the provider's own body.
pub async fn receive_webhook(
    State(state): State<WebhookAppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let cmd = ProcessPaymentWebhookCommand {
        provider: PaymentProvider::from_route(&path),
        route: format!("/webhooks/{}", path),
        body: body.to_vec(),
    };

    let ack = state.webhook_handler.handle(cmd).await?;
    Ok((StatusCode::OK, Json(ack.body)))
}

/// GET /health - Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics(State(state): State<WebhookAppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("METRICS_ERROR", "Failed to render metrics")),
            )
                .into_response()
        }
    }
}
