//! Lookup of configured callback verifiers by provider.

use std::collections::HashMap;
use std::sync::Arc;

use super::verifier::CallbackVerifier;
use crate::domain::payment::PaymentProvider;

/// Verifiers available to the intake, one per provider.
#[derive(Clone, Default)]
pub struct VerifierRegistry {
    verifiers: HashMap<PaymentProvider, Arc<dyn CallbackVerifier>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a verifier, replacing any previous one for its provider.
    pub fn with(mut self, verifier: impl CallbackVerifier + 'static) -> Self {
        self.verifiers.insert(verifier.provider(), Arc::new(verifier));
        self
    }

    pub fn get(&self, provider: PaymentProvider) -> Option<Arc<dyn CallbackVerifier>> {
        self.verifiers.get(&provider).cloned()
    }

    pub fn providers(&self) -> Vec<PaymentProvider> {
        let mut providers: Vec<_> = self.verifiers.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }
}

impl std::fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::{PayOsVerifier, ZaloPayVerifier};
    use secrecy::SecretString;

    #[test]
    fn empty_registry_has_no_verifiers() {
        let registry = VerifierRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(PaymentProvider::ZaloPay).is_none());
    }

    #[test]
    fn registered_verifiers_are_found_by_provider() {
        let registry = VerifierRegistry::new()
            .with(ZaloPayVerifier::new(SecretString::new("k2".into())))
            .with(PayOsVerifier::new(SecretString::new("ck".into())));

        assert_eq!(
            registry.get(PaymentProvider::ZaloPay).map(|v| v.provider()),
            Some(PaymentProvider::ZaloPay)
        );
        assert_eq!(
            registry.get(PaymentProvider::PayOs).map(|v| v.provider()),
            Some(PaymentProvider::PayOs)
        );
        assert!(registry.get(PaymentProvider::VnPay).is_none());
        assert_eq!(
            registry.providers(),
            vec![PaymentProvider::PayOs, PaymentProvider::ZaloPay]
        );
    }

    #[test]
    fn debug_output_lists_providers_only() {
        let registry =
            VerifierRegistry::new().with(ZaloPayVerifier::new(SecretString::new("secret".into())));
        let debug = format!("{:?}", registry);
        assert!(debug.contains("ZaloPay"));
        assert!(!debug.contains("secret"));
    }
}
