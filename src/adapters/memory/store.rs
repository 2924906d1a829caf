//! In-memory payment and outbox store for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations, which panics if a lock is poisoned.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEntryId, Timestamp};
use crate::domain::outbox::OutboxEntry;
use crate::domain::payment::{Payment, TerminalOutcome, TransitionResult};
use crate::ports::{OutboxRepository, PaymentStore, RecordOutcome};

#[derive(Default)]
struct State {
    payments: HashMap<String, Payment>,
    outbox: Vec<OutboxEntry>,
}

/// Payments and outbox entries behind one lock.
///
/// Holding a single lock for both tables gives `record_outcome` the same
/// all-or-nothing visibility as a database transaction.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    state: Mutex<State>,
    fail_outbox_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes the outbox insert inside `record_outcome` fail.
    pub fn set_fail_outbox_writes(&self, fail: bool) {
        self.fail_outbox_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `fetch_pending` and the stuck queries fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Inserts an entry as-is, bypassing the intake path.
    pub fn insert_entry(&self, entry: OutboxEntry) {
        self.lock().outbox.push(entry);
    }

    /// Snapshot of all outbox entries in insertion order.
    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.lock().outbox.clone()
    }

    pub fn entry(&self, id: OutboxEntryId) -> Option<OutboxEntry> {
        self.lock().outbox.iter().find(|e| e.id == id).cloned()
    }

    /// Moves an entry's `published_at` into the past.
    pub fn backdate_published(&self, id: OutboxEntryId, published_at: Timestamp) {
        if let Some(entry) = self.lock().outbox.iter_mut().find(|e| e.id == id) {
            entry.published_at = Some(published_at);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("InMemoryPaymentStore: lock poisoned")
    }

    fn check_reads(&self) -> Result<(), DomainError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Simulated outbox read failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut state = self.lock();
        if state.payments.contains_key(&payment.order_code) {
            return Err(DomainError::new(
                ErrorCode::PaymentExists,
                format!("Payment for order {} already exists", payment.order_code),
            ));
        }
        state
            .payments
            .insert(payment.order_code.clone(), payment.clone());
        Ok(())
    }

    async fn find_by_order_code(&self, order_code: &str) -> Result<Option<Payment>, DomainError> {
        Ok(self.lock().payments.get(order_code).cloned())
    }

    async fn record_outcome(&self, outcome: &TerminalOutcome) -> Result<RecordOutcome, DomainError> {
        let mut state = self.lock();
        let Some(current) = state.payments.get(&outcome.order_code) else {
            return Ok(RecordOutcome::NotFound);
        };

        let mut updated = current.clone();
        match updated.apply_outcome(outcome) {
            TransitionResult::AlreadyRecorded => {
                return Ok(RecordOutcome::AlreadyRecorded { payment: updated })
            }
            TransitionResult::Conflict { current } => return Ok(RecordOutcome::Conflict { current }),
            TransitionResult::Applied => {}
        }

        let entry = OutboxEntry::for_payment(&updated)?;
        if self.fail_outbox_writes.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Simulated outbox insert failure",
            ));
        }

        let outbox_entry_id = entry.id;
        state.outbox.push(entry);
        state
            .payments
            .insert(updated.order_code.clone(), updated.clone());

        Ok(RecordOutcome::Recorded {
            payment: updated,
            outbox_entry_id,
        })
    }
}

#[async_trait]
impl OutboxRepository for InMemoryPaymentStore {
    async fn fetch_pending(
        &self,
        limit: u32,
        max_retries: u32,
    ) -> Result<Vec<OutboxEntry>, DomainError> {
        self.check_reads()?;
        let mut pending: Vec<OutboxEntry> = self
            .lock()
            .outbox
            .iter()
            .filter(|e| e.is_deliverable(max_retries))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_published(&self, id: OutboxEntryId) -> Result<bool, DomainError> {
        let mut state = self.lock();
        Ok(state
            .outbox
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| e.mark_published(Timestamp::now()))
            .unwrap_or(false))
    }

    async fn record_failure(&self, id: OutboxEntryId, error: &str) -> Result<bool, DomainError> {
        let mut state = self.lock();
        Ok(state
            .outbox
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| e.record_failure(error))
            .unwrap_or(false))
    }

    async fn delete_published_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut state = self.lock();
        let before = state.outbox.len();
        state.outbox.retain(|e| {
            !(e.published && e.published_at.map(|at| at.is_before(&cutoff)).unwrap_or(false))
        });
        Ok((before - state.outbox.len()) as u64)
    }

    async fn count_stuck(&self, max_retries: u32) -> Result<u64, DomainError> {
        self.check_reads()?;
        Ok(self
            .lock()
            .outbox
            .iter()
            .filter(|e| e.is_stuck(max_retries))
            .count() as u64)
    }

    async fn find_stuck(
        &self,
        max_retries: u32,
        limit: u32,
    ) -> Result<Vec<OutboxEntry>, DomainError> {
        self.check_reads()?;
        let mut stuck: Vec<OutboxEntry> = self
            .lock()
            .outbox
            .iter()
            .filter(|e| e.is_stuck(max_retries))
            .cloned()
            .collect();
        stuck.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        stuck.truncate(limit as usize);
        Ok(stuck)
    }
}
