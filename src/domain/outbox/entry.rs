//! Outbox entry entity.
//!
//! # Invariants
//!
//! - `published` implies `published_at.is_some()`
//! - `retry_count` never decreases
//! - A published entry is never mutated again; retention may delete it

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEntryId, Timestamp};
use crate::domain::payment::{Payment, PaymentEventPayload, PaymentEventType};
use serde::Serialize;

/// Aggregate type recorded for payment events.
pub const PAYMENT_AGGREGATE_TYPE: &str = "Payment";

/// Longest `last_error` kept on an entry, in characters.
pub const MAX_ERROR_LEN: usize = 500;

/// An event waiting in (or delivered from) the outbox table.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: OutboxEntryId,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: PaymentEventType,
    pub payload: serde_json::Value,
    pub published: bool,
    pub published_at: Option<Timestamp>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
}

impl OutboxEntry {
    /// Builds the unpublished entry announcing a settled payment.
    ///
    /// # Errors
    ///
    /// Fails if the payment has not settled.
    pub fn for_payment(payment: &Payment) -> Result<Self, DomainError> {
        let payload = PaymentEventPayload::snapshot(payment)?;
        let event_type = PaymentEventType::for_status(payment.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Pending payments do not raise events",
            )
        })?;
        let payload = serde_json::to_value(&payload).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to serialize payment payload: {}", e),
            )
        })?;

        Ok(Self {
            id: OutboxEntryId::new(),
            aggregate_id: payment.id.to_string(),
            aggregate_type: PAYMENT_AGGREGATE_TYPE.to_string(),
            event_type,
            payload,
            published: false,
            published_at: None,
            retry_count: 0,
            last_error: None,
            created_at: payment.updated_at,
        })
    }

    /// True while the relay should still try this entry.
    pub fn is_deliverable(&self, max_retries: u32) -> bool {
        !self.published && self.retry_count < max_retries
    }

    /// True once the retry budget is spent without delivery.
    pub fn is_stuck(&self, max_retries: u32) -> bool {
        !self.published && self.retry_count >= max_retries
    }

    /// Marks the entry delivered. Returns false if it already was.
    pub fn mark_published(&mut self, at: Timestamp) -> bool {
        if self.published {
            return false;
        }
        self.published = true;
        self.published_at = Some(at);
        true
    }

    /// Counts a failed delivery attempt. Published entries are left alone.
    pub fn record_failure(&mut self, error: &str) -> bool {
        if self.published {
            return false;
        }
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(truncate_error(error));
        true
    }
}

/// Cuts an error message to `MAX_ERROR_LEN` characters.
pub fn truncate_error(error: &str) -> String {
    match error.char_indices().nth(MAX_ERROR_LEN) {
        Some((byte_idx, _)) => error[..byte_idx].to_string(),
        None => error.to_string(),
    }
}

/// Diagnostic view of an entry that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StuckEntrySummary {
    pub id: OutboxEntryId,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
}

impl From<&OutboxEntry> for StuckEntrySummary {
    fn from(entry: &OutboxEntry) -> Self {
        Self {
            id: entry.id,
            event_type: entry.event_type.to_string(),
            aggregate_type: entry.aggregate_type.clone(),
            aggregate_id: entry.aggregate_id.clone(),
            retry_count: entry.retry_count,
            last_error: entry.last_error.clone(),
            created_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{PaymentProvider, TerminalOutcome};

    fn settled_payment(success: bool) -> Payment {
        let mut payment =
            Payment::new_pending("ORD-1001", 150_000, "VND", PaymentProvider::ZaloPay).unwrap();
        payment.apply_outcome(&TerminalOutcome::new("ORD-1001", success, None));
        payment
    }

    #[test]
    fn for_payment_builds_unpublished_entry() {
        let payment = settled_payment(true);
        let entry = OutboxEntry::for_payment(&payment).unwrap();

        assert_eq!(entry.aggregate_id, payment.id.to_string());
        assert_eq!(entry.aggregate_type, "Payment");
        assert_eq!(entry.event_type, PaymentEventType::PaymentCompleted);
        assert!(!entry.published);
        assert!(entry.published_at.is_none());
        assert_eq!(entry.retry_count, 0);
        assert_eq!(entry.payload["orderCode"], "ORD-1001");
    }

    #[test]
    fn for_payment_uses_failed_event_for_failed_payment() {
        let entry = OutboxEntry::for_payment(&settled_payment(false)).unwrap();
        assert_eq!(entry.event_type, PaymentEventType::PaymentFailed);
    }

    #[test]
    fn for_payment_rejects_pending_payment() {
        let payment =
            Payment::new_pending("ORD-1", 1, "VND", PaymentProvider::PayOs).unwrap();
        assert!(OutboxEntry::for_payment(&payment).is_err());
    }

    #[test]
    fn mark_published_sets_timestamp_once() {
        let mut entry = OutboxEntry::for_payment(&settled_payment(true)).unwrap();
        let at = Timestamp::now();

        assert!(entry.mark_published(at));
        assert!(!entry.mark_published(at.plus_seconds(5)));
        assert_eq!(entry.published_at, Some(at));
    }

    #[test]
    fn record_failure_increments_and_truncates() {
        let mut entry = OutboxEntry::for_payment(&settled_payment(true)).unwrap();
        let long = "x".repeat(MAX_ERROR_LEN + 20);

        assert!(entry.record_failure(&long));
        assert!(entry.record_failure("broker down"));

        assert_eq!(entry.retry_count, 2);
        assert_eq!(entry.last_error.as_deref(), Some("broker down"));
    }

    #[test]
    fn record_failure_ignores_published_entry() {
        let mut entry = OutboxEntry::for_payment(&settled_payment(true)).unwrap();
        entry.mark_published(Timestamp::now());

        assert!(!entry.record_failure("late failure"));
        assert_eq!(entry.retry_count, 0);
    }

    #[test]
    fn truncate_error_respects_char_boundaries() {
        let long = "é".repeat(MAX_ERROR_LEN + 1);
        let truncated = truncate_error(&long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_LEN);
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn deliverable_and_stuck_partition_unpublished_entries() {
        let mut entry = OutboxEntry::for_payment(&settled_payment(true)).unwrap();
        for _ in 0..4 {
            entry.record_failure("boom");
        }
        assert!(entry.is_deliverable(5));
        assert!(!entry.is_stuck(5));

        entry.record_failure("boom");
        assert!(!entry.is_deliverable(5));
        assert!(entry.is_stuck(5));
    }
}
