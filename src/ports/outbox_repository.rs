//! OutboxRepository port - Relay and retention access to the outbox table.
//!
//! Delivery is at-least-once. Every mutation here is conditional on the entry
//! still being unpublished, which is what keeps two overlapping relay passes
//! from double-counting.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OutboxEntryId, Timestamp};
use crate::domain::outbox::OutboxEntry;

/// Port for reading and updating outbox entries.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Unpublished entries with `retry_count < max_retries`, oldest first.
    ///
    /// Ordered by `created_at`, then id.
    async fn fetch_pending(
        &self,
        limit: u32,
        max_retries: u32,
    ) -> Result<Vec<OutboxEntry>, DomainError>;

    /// Marks an entry published if it still is not.
    ///
    /// Returns true when this call made the transition.
    async fn mark_published(&self, id: OutboxEntryId) -> Result<bool, DomainError>;

    /// Increments the retry count of an unpublished entry and stores the
    /// error, truncated.
    ///
    /// Returns false when the entry was already published or is gone.
    async fn record_failure(&self, id: OutboxEntryId, error: &str) -> Result<bool, DomainError>;

    /// Deletes published entries whose `published_at` is before `cutoff`.
    async fn delete_published_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;

    /// Number of unpublished entries with `retry_count >= max_retries`.
    async fn count_stuck(&self, max_retries: u32) -> Result<u64, DomainError>;

    /// Oldest stuck entries, at most `limit`.
    async fn find_stuck(
        &self,
        max_retries: u32,
        limit: u32,
    ) -> Result<Vec<OutboxEntry>, DomainError>;
}
