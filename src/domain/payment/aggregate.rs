//! Payment aggregate.
//!
//! # Invariants
//!
//! - `order_code` is unique and non-empty
//! - `completed_at` is set iff status is Completed
//! - `failed_at` is set iff status is Failed
//! - At most one terminal transition is ever applied

use crate::domain::foundation::{PaymentId, StateMachine, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

use super::{PaymentProvider, PaymentStatus};

/// A payment tracked from order placement until the provider reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_code: String,
    /// Amount in the currency's minor unit.
    pub amount_cents: i64,
    pub currency: String,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub provider_transaction_id: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Terminal outcome reported by an authenticated provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOutcome {
    pub order_code: String,
    pub success: bool,
    pub provider_transaction_id: Option<String>,
    pub occurred_at: Timestamp,
}

impl TerminalOutcome {
    /// Builds an outcome stamped with the current time.
    pub fn new(
        order_code: impl Into<String>,
        success: bool,
        provider_transaction_id: Option<String>,
    ) -> Self {
        Self {
            order_code: order_code.into(),
            success,
            provider_transaction_id,
            occurred_at: Timestamp::now(),
        }
    }

    /// Status the payment should end up in.
    pub fn target_status(&self) -> PaymentStatus {
        if self.success {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        }
    }
}

/// What applying a terminal outcome did to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Payment moved from Pending to the target status.
    Applied,
    /// Payment already held the target status; nothing changed.
    AlreadyRecorded,
    /// Payment holds a different terminal status; nothing changed.
    Conflict { current: PaymentStatus },
}

impl TransitionResult {
    /// Classifies a callback against a payment that is no longer Pending.
    pub fn for_settled(current: PaymentStatus, target: PaymentStatus) -> Self {
        if current == target {
            TransitionResult::AlreadyRecorded
        } else {
            TransitionResult::Conflict { current }
        }
    }
}

impl Payment {
    /// Creates a pending payment awaiting its provider callback.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty order code, a negative amount,
    /// or a currency that is not a three-letter code.
    pub fn new_pending(
        order_code: impl Into<String>,
        amount_cents: i64,
        currency: impl Into<String>,
        provider: PaymentProvider,
    ) -> Result<Self, ValidationError> {
        let order_code = order_code.into();
        if order_code.trim().is_empty() {
            return Err(ValidationError::empty_field("order_code"));
        }
        if amount_cents < 0 {
            return Err(ValidationError::invalid_format(
                "amount_cents",
                "must not be negative",
            ));
        }
        let currency = currency.into().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "must be a 3-letter ISO code",
            ));
        }

        let now = Timestamp::now();
        Ok(Self {
            id: PaymentId::new(),
            order_code,
            amount_cents,
            currency,
            provider,
            status: PaymentStatus::Pending,
            provider_transaction_id: None,
            completed_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a provider outcome.
    ///
    /// Only a Pending payment is mutated. A settled payment is left untouched
    /// and the result says whether the callback repeated or contradicted it.
    pub fn apply_outcome(&mut self, outcome: &TerminalOutcome) -> TransitionResult {
        let target = outcome.target_status();
        if self.status.transition_to(target).is_err() {
            return TransitionResult::for_settled(self.status, target);
        }

        self.status = target;
        match target {
            PaymentStatus::Completed => self.completed_at = Some(outcome.occurred_at),
            _ => self.failed_at = Some(outcome.occurred_at),
        }
        if outcome.provider_transaction_id.is_some() {
            self.provider_transaction_id = outcome.provider_transaction_id.clone();
        }
        self.updated_at = outcome.occurred_at;
        TransitionResult::Applied
    }

    /// Moment the payment reached its terminal status, if it has.
    pub fn settled_at(&self) -> Option<Timestamp> {
        self.completed_at.or(self.failed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Payment {
        Payment::new_pending("ORD-1001", 150_000, "vnd", PaymentProvider::ZaloPay).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Construction
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_pending_normalizes_currency() {
        let payment = pending();
        assert_eq!(payment.currency, "VND");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.settled_at().is_none());
    }

    #[test]
    fn new_pending_rejects_empty_order_code() {
        let result = Payment::new_pending("  ", 100, "VND", PaymentProvider::PayOs);
        assert_eq!(result, Err(ValidationError::empty_field("order_code")));
    }

    #[test]
    fn new_pending_rejects_negative_amount() {
        assert!(Payment::new_pending("ORD-1", -1, "VND", PaymentProvider::PayOs).is_err());
    }

    #[test]
    fn new_pending_rejects_bad_currency() {
        assert!(Payment::new_pending("ORD-1", 1, "VN", PaymentProvider::PayOs).is_err());
        assert!(Payment::new_pending("ORD-1", 1, "V1D", PaymentProvider::PayOs).is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Outcomes
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn success_outcome_completes_payment() {
        let mut payment = pending();
        let outcome = TerminalOutcome::new("ORD-1001", true, Some("240501000001".into()));

        assert_eq!(payment.apply_outcome(&outcome), TransitionResult::Applied);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.completed_at, Some(outcome.occurred_at));
        assert!(payment.failed_at.is_none());
        assert_eq!(payment.provider_transaction_id.as_deref(), Some("240501000001"));
    }

    #[test]
    fn failure_outcome_fails_payment() {
        let mut payment = pending();
        let outcome = TerminalOutcome::new("ORD-1001", false, None);

        assert_eq!(payment.apply_outcome(&outcome), TransitionResult::Applied);
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failed_at, Some(outcome.occurred_at));
        assert!(payment.completed_at.is_none());
    }

    #[test]
    fn repeated_outcome_is_already_recorded() {
        let mut payment = pending();
        payment.apply_outcome(&TerminalOutcome::new("ORD-1001", true, None));
        let before = payment.clone();

        let result = payment.apply_outcome(&TerminalOutcome::new("ORD-1001", true, None));

        assert_eq!(result, TransitionResult::AlreadyRecorded);
        assert_eq!(payment, before);
    }

    #[test]
    fn contradicting_outcome_is_a_conflict() {
        let mut payment = pending();
        payment.apply_outcome(&TerminalOutcome::new("ORD-1001", false, None));
        let before = payment.clone();

        let result = payment.apply_outcome(&TerminalOutcome::new("ORD-1001", true, None));

        assert_eq!(
            result,
            TransitionResult::Conflict {
                current: PaymentStatus::Failed
            }
        );
        assert_eq!(payment, before);
    }
}
