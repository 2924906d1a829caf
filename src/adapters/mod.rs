//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Payment and outbox persistence
//! - `kafka` - Broker producer
//! - `metrics` - Prometheus counters
//! - `http` - Axum intake router
//! - `memory` - In-memory adapters for tests

pub mod http;
pub mod kafka;
pub mod memory;
pub mod metrics;
pub mod postgres;

pub use kafka::KafkaMessageProducer;
pub use memory::{InMemoryMessageProducer, InMemoryMetricsCollector, InMemoryPaymentStore};
pub use metrics::PrometheusMetricsCollector;
pub use postgres::PostgresPaymentStore;
