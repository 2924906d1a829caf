//! Webhook error types for provider callback intake.
//!
//! Authentication and payload problems never reach this type as errors: the
//! provider expects its own rejection body with a 200. What is left are the
//! cases where the service itself cannot answer.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that stop a callback from being acknowledged.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No verifier is configured for the provider named in the route.
    #[error("Unknown payment provider: {0}")]
    UnknownProvider(String),

    /// Callback signature did not match.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Callback was missing required fields.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Authenticated callback names an order this service has not seen yet.
    #[error("Payment not found for order {0}")]
    PaymentNotFound(String),

    /// Store failed while recording the outcome.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver the callback.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Storage(_) | WebhookError::PaymentNotFound(_)
        )
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::UnknownProvider(_) | WebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::PaymentNotFound(_) | WebhookError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn unknown_provider_displays_route_fragment() {
        let err = WebhookError::UnknownProvider("/webhooks/stripe".into());
        assert_eq!(err.to_string(), "Unknown payment provider: /webhooks/stripe");
    }

    #[test]
    fn payment_not_found_displays_order_code() {
        let err = WebhookError::PaymentNotFound("ORD-1001".into());
        assert_eq!(err.to_string(), "Payment not found for order ORD-1001");
    }

    // ══════════════════════════════════════════════════════════════
    // Status codes and retryability
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn unknown_provider_is_bad_request() {
        let err = WebhookError::UnknownProvider("x".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_retryable());
    }

    #[test]
    fn payment_not_found_is_retryable_server_error() {
        let err = WebhookError::PaymentNotFound("ORD-1".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn storage_is_retryable_server_error() {
        let err = WebhookError::Storage("connection reset".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn invalid_signature_is_not_retryable() {
        assert!(!WebhookError::InvalidSignature.is_retryable());
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
