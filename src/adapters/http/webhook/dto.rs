//! Response DTOs for the webhook and operational endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::webhook::WebhookError;

/// Error body for non-acknowledged callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Error code for programmatic handling.
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    /// Maps a webhook error to its public body. Storage detail stays in logs.
    pub fn from_webhook_error(err: &WebhookError) -> Self {
        match err {
            WebhookError::UnknownProvider(_) => Self::new("UNKNOWN_PROVIDER", err.to_string()),
            WebhookError::InvalidSignature => Self::new("INVALID_SIGNATURE", err.to_string()),
            WebhookError::InvalidPayload(_) => Self::new("INVALID_PAYLOAD", err.to_string()),
            WebhookError::PaymentNotFound(_) => Self::new("PAYMENT_NOT_FOUND", err.to_string()),
            WebhookError::Storage(_) => Self::new("INTERNAL_ERROR", "Internal server error"),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_serializes_error_field() {
        let body = serde_json::to_value(ErrorResponse::new("UNKNOWN_PROVIDER", "nope")).unwrap();
        assert_eq!(body, serde_json::json!({"error": "nope", "code": "UNKNOWN_PROVIDER"}));
    }

    #[test]
    fn storage_detail_is_not_exposed() {
        let err = WebhookError::Storage("password authentication failed for user".into());
        let body = ErrorResponse::from_webhook_error(&err);
        assert_eq!(body.error, "Internal server error");
        assert!(!body.error.contains("password"));
    }

    #[test]
    fn health_is_ok() {
        assert_eq!(
            serde_json::to_value(HealthResponse::ok()).unwrap(),
            serde_json::json!({"status": "ok"})
        );
    }
}
