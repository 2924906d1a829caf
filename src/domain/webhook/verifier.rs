//! Callback verification contract and the HMAC primitives shared by providers.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::payment::PaymentProvider;

/// Result of checking one provider callback.
///
/// `order_code` is `None` whenever the callback was not authenticated. In
/// that case no state may change and `response_body` goes back verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackVerification {
    pub order_code: Option<String>,
    pub success: bool,
    pub provider_transaction_id: Option<String>,
    pub response_body: Value,
}

impl CallbackVerification {
    /// An unauthenticated result carrying the provider's rejection body.
    pub fn rejected(response_body: Value) -> Self {
        Self {
            order_code: None,
            success: false,
            provider_transaction_id: None,
            response_body,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.order_code.is_some()
    }
}

/// Authenticates callbacks from one payment provider.
pub trait CallbackVerifier: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// Checks the callback body and extracts its outcome.
    fn verify(&self, body: &Value) -> CallbackVerification;
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `message` under `key`, as raw bytes.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// HMAC-SHA256 of `message` under `key`, lowercase hex.
pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    hex::encode(hmac_sha256(key, message))
}

/// Compares a supplied hex MAC against the expected digest in constant time.
///
/// Only the exact lowercase hex rendering matches. Surrounding whitespace,
/// uppercase digits and wrong lengths are all rejected.
pub fn mac_matches(expected: &[u8], supplied_hex: &str) -> bool {
    let expected_hex = hex::encode(expected);
    expected_hex.as_bytes().ct_eq(supplied_hex.as_bytes()).into()
}

/// Reads a JSON field that providers send either as a string or a number.
pub(crate) fn string_or_number(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
