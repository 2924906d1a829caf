//! Provider callback authentication.
//!
//! Verifiers are pure: they take the parsed callback body and decide whether
//! it is authentic, which order it concerns, and what to answer the provider.

mod errors;
mod payos;
mod registry;
mod verifier;
mod zalopay;

pub use errors::WebhookError;
pub use payos::{canonicalize as canonicalize_payos_data, PayOsVerifier};
pub use registry::VerifierRegistry;
pub use verifier::{
    hmac_sha256, hmac_sha256_hex, mac_matches, CallbackVerification, CallbackVerifier,
};
pub use zalopay::{order_code_from_app_trans_id, ZaloPayVerifier};
