//! Events published when a payment settles.

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Payment, PaymentProvider, PaymentStatus};

/// Kind of payment event carried by an outbox entry.
///
/// Stored as text, so rows written by a newer release may carry a type this
/// build does not know. Those load as `Unrecognized` and are never published.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentEventType {
    PaymentCompleted,
    PaymentFailed,
    Unrecognized(String),
}

impl PaymentEventType {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &str {
        match self {
            PaymentEventType::PaymentCompleted => "PAYMENT_COMPLETED",
            PaymentEventType::PaymentFailed => "PAYMENT_FAILED",
            PaymentEventType::Unrecognized(raw) => raw,
        }
    }

    /// Parses the stored form. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PAYMENT_COMPLETED" => PaymentEventType::PaymentCompleted,
            "PAYMENT_FAILED" => PaymentEventType::PaymentFailed,
            other => PaymentEventType::Unrecognized(other.to_string()),
        }
    }

    /// Event raised when a payment enters `status`, if any.
    pub fn for_status(status: PaymentStatus) -> Option<Self> {
        match status {
            PaymentStatus::Completed => Some(PaymentEventType::PaymentCompleted),
            PaymentStatus::Failed => Some(PaymentEventType::PaymentFailed),
            PaymentStatus::Pending => None,
        }
    }
}

impl fmt::Display for PaymentEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// By-value snapshot of a settled payment.
///
/// Consumers receive this as the message body, so it carries everything they
/// need without reading the payments table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventPayload {
    pub payment_id: PaymentId,
    pub order_code: String,
    pub amount_cents: i64,
    pub currency: String,
    pub provider: PaymentProvider,
    pub provider_transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub occurred_at: Timestamp,
}

impl PaymentEventPayload {
    /// Captures a settled payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the payment is still Pending.
    pub fn snapshot(payment: &Payment) -> Result<Self, DomainError> {
        let occurred_at = payment.settled_at().ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Payment {} has not settled", payment.order_code),
            )
        })?;

        Ok(Self {
            payment_id: payment.id,
            order_code: payment.order_code.clone(),
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            provider: payment.provider,
            provider_transaction_id: payment.provider_transaction_id.clone(),
            status: payment.status,
            occurred_at,
        })
    }
}
