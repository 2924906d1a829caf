//! Metrics adapters.

mod prometheus_collector;

pub use prometheus_collector::PrometheusMetricsCollector;
