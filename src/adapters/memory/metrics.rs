//! In-memory metrics collector for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MetricsCollector;

/// Accumulates counters and keeps the last gauge value by name. Can be set
/// failing.
#[derive(Default)]
pub struct InMemoryMetricsCollector {
    counters: Mutex<HashMap<String, u64>>,
    gauges: Mutex<HashMap<String, u64>>,
    failing: AtomicBool,
}

impl InMemoryMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total recorded for `name`, or `None` if never recorded.
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters
            .lock()
            .expect("InMemoryMetricsCollector: lock poisoned")
            .get(name)
            .copied()
    }

    /// Last value set for `name`, or `None` if never set.
    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.gauges
            .lock()
            .expect("InMemoryMetricsCollector: lock poisoned")
            .get(name)
            .copied()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::MetricsError,
                "Simulated metrics backend failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsCollector for InMemoryMetricsCollector {
    async fn record_counter(&self, name: &str, value: u64) -> Result<(), DomainError> {
        self.check_available()?;
        *self
            .counters
            .lock()
            .expect("InMemoryMetricsCollector: lock poisoned")
            .entry(name.to_string())
            .or_insert(0) += value;
        Ok(())
    }

    async fn record_gauge(&self, name: &str, value: u64) -> Result<(), DomainError> {
        self.check_available()?;
        self.gauges
            .lock()
            .expect("InMemoryMetricsCollector: lock poisoned")
            .insert(name.to_string(), value);
        Ok(())
    }
}
