//! PaymentStore port - Atomic recording of payment outcomes.
//!
//! Recording an outcome changes the payment and appends its outbox entry in a
//! single transaction. Either both writes are visible afterwards or neither is.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OutboxEntryId};
use crate::domain::payment::{Payment, PaymentStatus, TerminalOutcome};

/// What `record_outcome` did.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Payment moved out of Pending and one outbox entry was inserted.
    Recorded {
        payment: Payment,
        outbox_entry_id: OutboxEntryId,
    },

    /// Payment already held this terminal status. Nothing was written.
    AlreadyRecorded { payment: Payment },

    /// Payment holds a different terminal status. Nothing was written.
    Conflict { current: PaymentStatus },

    /// No payment carries this order code.
    NotFound,
}

/// Port for payment persistence on the intake path.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new payment.
    ///
    /// # Errors
    ///
    /// `PaymentExists` if the order code is taken, `DatabaseError` otherwise.
    async fn create(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Finds a payment by its natural key.
    async fn find_by_order_code(&self, order_code: &str) -> Result<Option<Payment>, DomainError>;

    /// Applies a terminal outcome and enqueues its event atomically.
    ///
    /// Only a Pending payment is updated. The update is conditional on the
    /// stored status, so two concurrent callbacks for one order cannot both
    /// succeed.
    async fn record_outcome(&self, outcome: &TerminalOutcome) -> Result<RecordOutcome, DomainError>;
}
