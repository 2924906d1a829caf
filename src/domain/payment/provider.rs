//! Payment providers that may call back into the service.

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Third-party payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentProvider {
    #[serde(rename = "ZALOPAY")]
    ZaloPay,
    #[serde(rename = "PAYOS")]
    PayOs,
    #[serde(rename = "VNPAY")]
    VnPay,
}

impl PaymentProvider {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::ZaloPay => "ZALOPAY",
            PaymentProvider::PayOs => "PAYOS",
            PaymentProvider::VnPay => "VNPAY",
        }
    }

    /// Selects the provider named somewhere in a callback route.
    ///
    /// Matching is a case-insensitive substring test so both
    /// `/webhooks/zalopay` and `/api/v1/payments/ZaloPay/callback` resolve.
    pub fn from_route(path: &str) -> Option<Self> {
        let path = path.to_ascii_lowercase();
        if path.contains("zalopay") {
            Some(PaymentProvider::ZaloPay)
        } else if path.contains("payos") {
            Some(PaymentProvider::PayOs)
        } else if path.contains("vnpay") {
            Some(PaymentProvider::VnPay)
        } else {
            None
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ZALOPAY" => Ok(PaymentProvider::ZaloPay),
            "PAYOS" => Ok(PaymentProvider::PayOs),
            "VNPAY" => Ok(PaymentProvider::VnPay),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown payment provider '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_route_matches_substring_case_insensitively() {
        assert_eq!(
            PaymentProvider::from_route("/webhooks/zalopay"),
            Some(PaymentProvider::ZaloPay)
        );
        assert_eq!(
            PaymentProvider::from_route("/webhooks/v2/PayOS/callback"),
            Some(PaymentProvider::PayOs)
        );
        assert_eq!(
            PaymentProvider::from_route("/webhooks/vnpay-ipn"),
            Some(PaymentProvider::VnPay)
        );
    }

    #[test]
    fn from_route_returns_none_for_unknown_provider() {
        assert_eq!(PaymentProvider::from_route("/webhooks/stripe"), None);
        assert_eq!(PaymentProvider::from_route(""), None);
    }

    #[test]
    fn round_trips_through_stored_form() {
        for provider in [
            PaymentProvider::ZaloPay,
            PaymentProvider::PayOs,
            PaymentProvider::VnPay,
        ] {
            assert_eq!(provider.as_str().parse::<PaymentProvider>(), Ok(provider));
        }
    }
}
