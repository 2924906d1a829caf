//! Reasons a single outbox delivery attempt fails.

use thiserror::Error;

/// Failure of one delivery attempt. Both kinds count against the retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The entry cannot be routed or encoded; retrying will not help.
    #[error("Schema error: no topic mapped for event type '{event_type}'")]
    Schema { event_type: String },

    /// The broker rejected or timed out the send.
    #[error("Publish error: {0}")]
    Publish(String),
}

impl DeliveryFailure {
    pub fn is_schema(&self) -> bool {
        matches!(self, DeliveryFailure::Schema { .. })
    }
}
