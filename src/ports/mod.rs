//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentStore` - Atomic payment outcome + outbox insert
//! - `OutboxRepository` - Relay and retention access to outbox entries
//! - `MessageProducer` - Broker publishing
//! - `MetricsCollector` - Operational counters

mod message_producer;
mod metrics_collector;
mod outbox_repository;
mod payment_store;

pub use message_producer::{
    MessageHeaders, MessageProducer, OutboundMessage, PublishError, EVENT_VERSION,
};
pub use metrics_collector::{MetricsCollector, EVENTS_DELETED, FAILED_EVENTS};
pub use outbox_repository::OutboxRepository;
pub use payment_store::{PaymentStore, RecordOutcome};
