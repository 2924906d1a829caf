//! MetricsCollector port - Operational counters and gauges.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Published entries removed by retention. Counter.
pub const EVENTS_DELETED: &str = "EventsDeleted";

/// Entries currently holding an exhausted retry budget. Gauge.
pub const FAILED_EVENTS: &str = "FailedEvents";

/// Port for emitting metrics, dimensioned by service name.
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Adds `value` to a monotonic counter.
    async fn record_counter(&self, name: &str, value: u64) -> Result<(), DomainError>;

    /// Sets a gauge to the latest observed `value`.
    async fn record_gauge(&self, name: &str, value: u64) -> Result<(), DomainError>;
}
