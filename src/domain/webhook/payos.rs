//! PayOS callback verification.
//!
//! PayOS posts `{"code": "00", "desc": ..., "data": {...}, "signature": "<hex>"}`.
//! The signature covers a canonical `key=value&...` rendering of `data` with
//! keys in lexicographic order.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};

use super::errors::WebhookError;
use super::verifier::{hmac_sha256, mac_matches, string_or_number, CallbackVerification, CallbackVerifier};
use crate::domain::payment::PaymentProvider;

/// Verifier for PayOS callbacks, keyed by the checksum key.
pub struct PayOsVerifier {
    checksum_key: SecretString,
}

struct Authenticated {
    order_code: String,
    success: bool,
    provider_transaction_id: Option<String>,
}

impl PayOsVerifier {
    pub fn new(checksum_key: SecretString) -> Self {
        Self { checksum_key }
    }

    /// Ack sent after the outcome is recorded.
    pub fn success_body() -> Value {
        json!({"success": true})
    }

    fn rejection_body() -> Value {
        json!({"error": "Invalid signature"})
    }

    fn authenticate(&self, body: &Value) -> Result<Authenticated, WebhookError> {
        let data = body
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| WebhookError::InvalidPayload("missing data".into()))?;
        let signature = body
            .get("signature")
            .and_then(Value::as_str)
            .ok_or_else(|| WebhookError::InvalidPayload("missing signature".into()))?;

        let canonical = canonicalize(data);
        let expected = hmac_sha256(
            self.checksum_key.expose_secret().as_bytes(),
            canonical.as_bytes(),
        );
        if !mac_matches(&expected, signature) {
            return Err(WebhookError::InvalidSignature);
        }

        let order_code = string_or_number(data.get("orderCode"))
            .ok_or_else(|| WebhookError::InvalidPayload("missing orderCode".into()))?;

        Ok(Authenticated {
            order_code,
            success: data.get("code").and_then(Value::as_str) == Some("00"),
            provider_transaction_id: string_or_number(data.get("reference")),
        })
    }
}

/// Renders `data` as `k1=v1&k2=v2` with keys sorted.
///
/// Strings are written raw, `null` as the empty string, numbers and booleans
/// in JSON form, and nested arrays or objects as compact JSON.
pub fn canonicalize(data: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| format!("{}={}", key, canonical_value(&data[key.as_str()])))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

impl CallbackVerifier for PayOsVerifier {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::PayOs
    }

    fn verify(&self, body: &Value) -> CallbackVerification {
        match self.authenticate(body) {
            Ok(auth) => CallbackVerification {
                order_code: Some(auth.order_code),
                success: auth.success,
                provider_transaction_id: auth.provider_transaction_id,
                response_body: Self::success_body(),
            },
            Err(WebhookError::InvalidSignature) => {
                tracing::warn!(
                    security_event = true,
                    provider = "PAYOS",
                    "Callback signature mismatch"
                );
                CallbackVerification::rejected(Self::rejection_body())
            }
            Err(err) => {
                tracing::warn!(provider = "PAYOS", error = %err, "Rejected malformed callback");
                CallbackVerification::rejected(Self::rejection_body())
            }
        }
    }
}
