//! In-memory adapters for tests and local runs without infrastructure.

mod metrics;
mod producer;
mod store;

pub use metrics::InMemoryMetricsCollector;
pub use producer::InMemoryMessageProducer;
pub use store::InMemoryPaymentStore;
