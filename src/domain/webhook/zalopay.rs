//! ZaloPay callback verification.
//!
//! ZaloPay posts `{"data": "<json string>", "mac": "<hex>", "type": 1}` where
//! `mac = HMAC-SHA256(data, key2)`. The order code travels inside `data` as the
//! suffix of `app_trans_id` (`<yymmdd>_<orderCode>`).

use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use super::errors::WebhookError;
use super::verifier::{hmac_sha256, mac_matches, string_or_number, CallbackVerification, CallbackVerifier};
use crate::domain::payment::PaymentProvider;

/// Verifier for ZaloPay callbacks, keyed by the merchant's `key2`.
pub struct ZaloPayVerifier {
    key2: SecretString,
}

struct Authenticated {
    order_code: String,
    provider_transaction_id: Option<String>,
}

impl ZaloPayVerifier {
    pub fn new(key2: SecretString) -> Self {
        Self { key2 }
    }

    /// Ack sent after the outcome is recorded.
    pub fn success_body() -> Value {
        json!({"return_code": 1, "return_message": "success"})
    }

    fn rejection_body(err: &WebhookError) -> Value {
        match err {
            WebhookError::InvalidSignature => {
                json!({"return_code": -1, "return_message": "mac not equal"})
            }
            _ => json!({"return_code": -1, "return_message": "invalid callback payload"}),
        }
    }

    fn authenticate(&self, body: &Value) -> Result<Authenticated, WebhookError> {
        let data = body
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| WebhookError::InvalidPayload("missing data".into()))?;
        let mac = body
            .get("mac")
            .and_then(Value::as_str)
            .ok_or_else(|| WebhookError::InvalidPayload("missing mac".into()))?;

        let expected = hmac_sha256(self.key2.expose_secret().as_bytes(), data.as_bytes());
        if !mac_matches(&expected, mac) {
            return Err(WebhookError::InvalidSignature);
        }

        let data: Value = serde_json::from_str(data)
            .map_err(|e| WebhookError::InvalidPayload(format!("data is not JSON: {}", e)))?;
        let app_trans_id = string_or_number(data.get("app_trans_id"))
            .ok_or_else(|| WebhookError::InvalidPayload("missing app_trans_id".into()))?;

        let order_code = order_code_from_app_trans_id(&app_trans_id);
        if order_code.trim().is_empty() {
            return Err(WebhookError::InvalidPayload("empty order code".into()));
        }

        Ok(Authenticated {
            order_code,
            provider_transaction_id: string_or_number(data.get("zp_trans_id")),
        })
    }
}

/// Takes the part after the first `_`, or the whole id when there is none.
pub fn order_code_from_app_trans_id(app_trans_id: &str) -> String {
    match app_trans_id.split_once('_') {
        Some((_, order_code)) => order_code.to_string(),
        None => app_trans_id.to_string(),
    }
}

impl CallbackVerifier for ZaloPayVerifier {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::ZaloPay
    }

    fn verify(&self, body: &Value) -> CallbackVerification {
        match self.authenticate(body) {
            Ok(auth) => CallbackVerification {
                order_code: Some(auth.order_code),
                success: true,
                provider_transaction_id: auth.provider_transaction_id,
                response_body: Self::success_body(),
            },
            Err(err @ WebhookError::InvalidSignature) => {
                tracing::warn!(
                    security_event = true,
                    provider = "ZALOPAY",
                    "Callback MAC mismatch"
                );
                CallbackVerification::rejected(Self::rejection_body(&err))
            }
            Err(err) => {
                tracing::warn!(provider = "ZALOPAY", error = %err, "Rejected malformed callback");
                CallbackVerification::rejected(Self::rejection_body(&err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::verifier::hmac_sha256_hex;
    use proptest::prelude::*;

    const KEY2: &str = "kLtgPl8HHhfvMuDHPwKfgfsY4Ydm9eIz";

    fn verifier() -> ZaloPayVerifier {
        ZaloPayVerifier::new(SecretString::new(KEY2.to_string()))
    }

    fn callback(data: &str) -> Value {
        json!({
            "data": data,
            "mac": hmac_sha256_hex(KEY2.as_bytes(), data.as_bytes()),
            "type": 1
        })
    }

    fn order_data() -> String {
        json!({
            "app_id": 2553,
            "app_trans_id": "240501_ORD-1001",
            "zp_trans_id": 240501000000123u64,
            "amount": 150000
        })
        .to_string()
    }

    // ══════════════════════════════════════════════════════════════
    // Authentic callbacks
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_mac_is_authenticated() {
        let result = verifier().verify(&callback(&order_data()));

        assert_eq!(result.order_code.as_deref(), Some("ORD-1001"));
        assert!(result.success);
        assert_eq!(
            result.provider_transaction_id.as_deref(),
            Some("240501000000123")
        );
        assert_eq!(result.response_body, ZaloPayVerifier::success_body());
    }

    #[test]
    fn app_trans_id_without_prefix_is_used_whole() {
        let data = json!({"app_trans_id": "ORD-77"}).to_string();
        let result = verifier().verify(&callback(&data));
        assert_eq!(result.order_code.as_deref(), Some("ORD-77"));
    }

    #[test]
    fn order_code_keeps_everything_after_first_underscore() {
        assert_eq!(order_code_from_app_trans_id("240501_ORD_9"), "ORD_9");
        assert_eq!(order_code_from_app_trans_id("ORD9"), "ORD9");
    }

    // ══════════════════════════════════════════════════════════════
    // Rejections
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn wrong_key_is_rejected_with_mac_not_equal() {
        let data = order_data();
        let body = json!({
            "data": data,
            "mac": hmac_sha256_hex(b"other-key", data.as_bytes()),
        });

        let result = verifier().verify(&body);

        assert!(!result.is_authenticated());
        assert_eq!(
            result.response_body,
            json!({"return_code": -1, "return_message": "mac not equal"})
        );
    }

    #[test]
    fn missing_mac_is_invalid_payload() {
        let result = verifier().verify(&json!({"data": order_data()}));
        assert!(!result.is_authenticated());
        assert_eq!(
            result.response_body,
            json!({"return_code": -1, "return_message": "invalid callback payload"})
        );
    }

    #[test]
    fn non_object_body_is_invalid_payload() {
        let result = verifier().verify(&Value::Null);
        assert_eq!(result.response_body["return_message"], "invalid callback payload");
    }

    #[test]
    fn authentic_but_unparsable_data_is_invalid_payload() {
        let result = verifier().verify(&callback("not json"));
        assert!(!result.is_authenticated());
        assert_eq!(result.response_body["return_message"], "invalid callback payload");
    }

    #[test]
    fn authentic_app_trans_id_with_empty_suffix_is_invalid_payload() {
        for app_trans_id in ["250101_", "250101_  "] {
            let data = json!({"app_trans_id": app_trans_id}).to_string();
            let result = verifier().verify(&callback(&data));

            assert!(!result.is_authenticated());
            assert_eq!(result.order_code, None);
            assert_eq!(
                result.response_body,
                json!({"return_code": -1, "return_message": "invalid callback payload"})
            );
        }
    }

    #[test]
    fn authentic_data_without_app_trans_id_is_invalid_payload() {
        let result = verifier().verify(&callback(r#"{"zp_trans_id": 1}"#));
        assert!(!result.is_authenticated());
    }

    // ══════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn flipping_a_bit_in_data_is_rejected(
            order in "[A-Z0-9-]{1,20}",
            position in any::<prop::sample::Index>(),
            bit in 0u8..7,
        ) {
            let data = json!({"app_trans_id": format!("240501_{}", order)}).to_string();
            let mut body = callback(&data);

            let mut bytes = data.into_bytes();
            let idx = position.index(bytes.len());
            bytes[idx] ^= 1 << bit;
            let tampered = String::from_utf8(bytes).unwrap();
            body["data"] = Value::String(tampered);

            prop_assert!(!verifier().verify(&body).is_authenticated());
        }

        #[test]
        fn flipping_a_bit_in_mac_is_rejected(
            order in "[A-Z0-9-]{1,20}",
            position in 0usize..32,
            bit in 0u8..8,
        ) {
            let data = json!({"app_trans_id": format!("240501_{}", order)}).to_string();
            let mut mac = hmac_sha256(KEY2.as_bytes(), data.as_bytes());
            mac[position] ^= 1 << bit;
            let body = json!({"data": data, "mac": hex::encode(mac)});

            let result = verifier().verify(&body);
            prop_assert!(!result.is_authenticated());
            prop_assert_eq!(&result.response_body["return_message"], "mac not equal");
        }

        #[test]
        fn any_signed_order_is_authenticated(order in "[A-Za-z0-9-]{1,30}") {
            let data = json!({"app_trans_id": format!("240501_{}", order)}).to_string();
            let result = verifier().verify(&callback(&data));
            prop_assert_eq!(result.order_code, Some(order));
        }
    }
}
