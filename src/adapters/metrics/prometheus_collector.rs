//! Prometheus implementation of the MetricsCollector port.
//!
//! ## Metrics Provided
//!
//! - `outbox_events_deleted_total{service}`: published entries removed by retention
//! - `outbox_failed_events{service}`: stuck entries found by the latest sweep

use async_trait::async_trait;
use prometheus::{opts, Encoder, IntCounterVec, IntGaugeVec, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{MetricsCollector, EVENTS_DELETED, FAILED_EVENTS};

/// Metrics registered in a private registry and rendered for `/metrics`.
#[derive(Clone)]
pub struct PrometheusMetricsCollector {
    registry: Registry,
    counters: Arc<HashMap<&'static str, IntCounterVec>>,
    gauges: Arc<HashMap<&'static str, IntGaugeVec>>,
    service: String,
}

impl PrometheusMetricsCollector {
    /// Registers the outbox metrics, labelled with `service`.
    ///
    /// # Errors
    ///
    /// Returns an error if metrics registration fails.
    pub fn new(service: impl Into<String>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_deleted = IntCounterVec::new(
            opts!(
                "outbox_events_deleted_total",
                "Published outbox entries deleted by retention"
            ),
            &["service"],
        )?;
        let failed_events = IntGaugeVec::new(
            opts!(
                "outbox_failed_events",
                "Outbox entries currently holding an exhausted retry budget"
            ),
            &["service"],
        )?;
        registry.register(Box::new(events_deleted.clone()))?;
        registry.register(Box::new(failed_events.clone()))?;

        let counters = HashMap::from([(EVENTS_DELETED, events_deleted)]);
        let gauges = HashMap::from([(FAILED_EVENTS, failed_events)]);

        Ok(Self {
            registry,
            counters: Arc::new(counters),
            gauges: Arc::new(gauges),
            service: service.into(),
        })
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, DomainError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| {
                DomainError::new(ErrorCode::MetricsError, format!("Failed to encode metrics: {}", e))
            })?;
        String::from_utf8(buffer).map_err(|e| {
            DomainError::new(ErrorCode::MetricsError, format!("Metrics are not UTF-8: {}", e))
        })
    }
}

#[async_trait]
impl MetricsCollector for PrometheusMetricsCollector {
    async fn record_counter(&self, name: &str, value: u64) -> Result<(), DomainError> {
        let counter = self.counters.get(name).ok_or_else(|| {
            DomainError::new(ErrorCode::MetricsError, format!("Unknown counter: {}", name))
        })?;
        counter
            .get_metric_with_label_values(&[self.service.as_str()])
            .map_err(|e| DomainError::new(ErrorCode::MetricsError, e.to_string()))?
            .inc_by(value);
        Ok(())
    }

    async fn record_gauge(&self, name: &str, value: u64) -> Result<(), DomainError> {
        let gauge = self.gauges.get(name).ok_or_else(|| {
            DomainError::new(ErrorCode::MetricsError, format!("Unknown gauge: {}", name))
        })?;
        let value = i64::try_from(value).map_err(|_| {
            DomainError::new(ErrorCode::MetricsError, format!("Gauge {} out of range", name))
        })?;
        gauge
            .get_metric_with_label_values(&[self.service.as_str()])
            .map_err(|e| DomainError::new(ErrorCode::MetricsError, e.to_string()))?
            .set(value);
        Ok(())
    }
}
