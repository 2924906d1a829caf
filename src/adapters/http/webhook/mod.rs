//! HTTP adapter for payment intake.
//!
//! - `POST /webhooks/*path` - Provider callbacks (ZaloPay, PayOS)
//! - `GET /health` - Liveness probe
//! - `GET /metrics` - Prometheus metrics

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, HealthResponse};
pub use handlers::{WebhookApiError, WebhookAppState};
pub use routes::webhook_router;
