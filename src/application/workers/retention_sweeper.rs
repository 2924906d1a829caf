//! RetentionSweeper - Deletes old published entries and reports stuck ones.
//!
//! Stuck entries are unpublished with an exhausted retry budget. They are
//! never deleted here; an operator decides what to do with them.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time;

use crate::config::OutboxConfig;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::outbox::StuckEntrySummary;
use crate::ports::{MetricsCollector, OutboxRepository, EVENTS_DELETED, FAILED_EVENTS};

/// Configuration for the RetentionSweeper worker.
#[derive(Debug, Clone)]
pub struct RetentionSweeperConfig {
    pub interval: Duration,
    pub pass_timeout: Duration,
    pub retention_days: u32,
    pub max_retries: u32,
    pub stuck_sample_size: u32,
}

impl Default for RetentionSweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            pass_timeout: Duration::from_secs(120),
            retention_days: 7,
            max_retries: 5,
            stuck_sample_size: 10,
        }
    }
}

impl From<&OutboxConfig> for RetentionSweeperConfig {
    fn from(outbox: &OutboxConfig) -> Self {
        Self {
            interval: outbox.sweep_interval(),
            pass_timeout: outbox.sweep_timeout(),
            retention_days: outbox.retention_days,
            max_retries: outbox.max_retries,
            stuck_sample_size: outbox.stuck_sample_size,
        }
    }
}

impl RetentionSweeperConfig {
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }
}

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub deleted: u64,
    pub stuck_count: u64,
    pub stuck_sample: Vec<StuckEntrySummary>,
}

pub struct RetentionSweeper {
    outbox: Arc<dyn OutboxRepository>,
    metrics: Arc<dyn MetricsCollector>,
    config: RetentionSweeperConfig,
}

impl RetentionSweeper {
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        metrics: Arc<dyn MetricsCollector>,
        config: RetentionSweeperConfig,
    ) -> Self {
        Self {
            outbox,
            metrics,
            config,
        }
    }

    /// Sweep on a fixed interval until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.run_pass_with_deadline().await;
                }
            }
        }

        tracing::info!("Retention sweeper stopped");
    }

    /// One sweep bounded by `pass_timeout`.
    pub async fn run_pass_with_deadline(&self) -> Option<SweepReport> {
        match time::timeout(self.config.pass_timeout, self.run_pass()).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Retention sweep failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.pass_timeout.as_secs(),
                    "Retention sweep timed out"
                );
                None
            }
        }
    }

    #[tracing::instrument(skip(self), fields(retention_days = self.config.retention_days))]
    pub async fn run_pass(&self) -> Result<SweepReport, DomainError> {
        let cutoff = Timestamp::now().minus_days(i64::from(self.config.retention_days));
        let deleted = self.outbox.delete_published_before(cutoff).await?;

        let stuck_count = self.outbox.count_stuck(self.config.max_retries).await?;
        let stuck_sample: Vec<StuckEntrySummary> = if stuck_count > 0 {
            self.outbox
                .find_stuck(self.config.max_retries, self.config.stuck_sample_size)
                .await?
                .iter()
                .map(StuckEntrySummary::from)
                .collect()
        } else {
            Vec::new()
        };

        if stuck_count > 0 {
            let sample = serde_json::to_string(&stuck_sample).unwrap_or_default();
            tracing::warn!(
                stuck_count,
                max_retries = self.config.max_retries,
                sample = %sample,
                "Outbox entries exhausted their retries"
            );
        }

        if let Err(e) = self.metrics.record_counter(EVENTS_DELETED, deleted).await {
            tracing::warn!(metric = EVENTS_DELETED, error = %e, "Failed to record metric");
        }
        if let Err(e) = self.metrics.record_gauge(FAILED_EVENTS, stuck_count).await {
            tracing::warn!(metric = FAILED_EVENTS, error = %e, "Failed to record metric");
        }

        tracing::info!(deleted, stuck_count, %cutoff, "Retention sweep complete");

        Ok(SweepReport {
            deleted,
            stuck_count,
            stuck_sample,
        })
    }
}
