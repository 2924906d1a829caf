//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::webhook::{PayOsVerifier, VerifierRegistry, ZaloPayVerifier};

/// Callback signing keys per provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// ZaloPay `key2`, used to check callback MACs
    pub zalopay_key2: Option<SecretString>,

    /// PayOS checksum key
    pub payos_checksum_key: Option<SecretString>,
}

fn configured(key: &Option<SecretString>) -> Option<&SecretString> {
    key.as_ref().filter(|k| !k.expose_secret().trim().is_empty())
}

impl PaymentConfig {
    /// Builds a verifier for every provider with a key
    pub fn verifier_registry(&self) -> VerifierRegistry {
        let mut registry = VerifierRegistry::new();
        if let Some(key) = configured(&self.zalopay_key2) {
            registry = registry.with(ZaloPayVerifier::new(key.clone()));
        }
        if let Some(key) = configured(&self.payos_checksum_key) {
            registry = registry.with(PayOsVerifier::new(key.clone()));
        }
        registry
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if configured(&self.zalopay_key2).is_none() && configured(&self.payos_checksum_key).is_none()
        {
            return Err(ValidationError::NoProviderConfigured);
        }
        Ok(())
    }
}
