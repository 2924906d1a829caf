//! Outbox domain module.
//!
//! - `entry` - OutboxEntry entity and stuck-entry summaries
//! - `topics` - Routing from event type to broker topic
//! - `delivery` - Per-attempt delivery failures

mod delivery;
mod entry;
mod topics;

pub use delivery::DeliveryFailure;
pub use entry::{
    truncate_error, OutboxEntry, StuckEntrySummary, MAX_ERROR_LEN, PAYMENT_AGGREGATE_TYPE,
};
pub use topics::TopicMap;
