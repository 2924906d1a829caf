//! OutboxRelay - Background worker that drains the outbox into the broker.
//!
//! Second half of the transactional outbox: intake writes the entry in the
//! same transaction as the payment update, the relay publishes it later.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 60s | Time between passes |
//! | `pass_timeout` | 60s | Deadline for one pass |
//! | `batch_size` | 100 | Max entries fetched per pass |
//! | `max_retries` | 5 | Attempts before an entry is stuck |
//! | `publish_concurrency` | 100 | In-flight publishes per pass |
//!
//! ## Delivery
//!
//! At-least-once. An entry is marked published only after the broker acked
//! it, and the mark is conditional on the entry still being unpublished, so
//! overlapping passes may duplicate a message but never double-count it.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time;
use uuid::Uuid;

use crate::config::OutboxConfig;
use crate::domain::foundation::DomainError;
use crate::domain::outbox::{DeliveryFailure, OutboxEntry, TopicMap};
use crate::ports::{MessageHeaders, MessageProducer, OutboundMessage, OutboxRepository, EVENT_VERSION};

/// Configuration for the OutboxRelay worker.
#[derive(Debug, Clone)]
pub struct OutboxRelayConfig {
    pub interval: Duration,
    pub pass_timeout: Duration,
    pub batch_size: u32,
    pub max_retries: u32,
    pub publish_concurrency: usize,
    /// Value of the `source` header.
    pub source: String,
    pub topics: TopicMap,
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            pass_timeout: Duration::from_secs(60),
            batch_size: 100,
            max_retries: 5,
            publish_concurrency: 100,
            source: "payment-service".to_string(),
            topics: TopicMap::default(),
        }
    }
}

impl OutboxRelayConfig {
    /// Relay settings from the outbox section plus broker routing.
    pub fn from_settings(outbox: &OutboxConfig, source: impl Into<String>, topics: TopicMap) -> Self {
        Self {
            interval: outbox.relay_interval(),
            pass_timeout: outbox.relay_timeout(),
            batch_size: outbox.batch_size,
            max_retries: outbox.max_retries,
            publish_concurrency: outbox.publish_concurrency,
            source: source.into(),
            topics,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_publish_concurrency(mut self, concurrency: usize) -> Self {
        self.publish_concurrency = concurrency;
        self
    }
}

/// Counts for one relay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub fetched: usize,
    /// Entries this pass transitioned to published.
    pub published: usize,
    /// Broker acked, but another pass had already marked the entry.
    pub already_published: usize,
    /// Publish attempts that failed and were recorded.
    pub failed: usize,
    /// Entries with no topic route, recorded as failures.
    pub schema_rejected: usize,
    /// Entries whose mark or failure write itself failed.
    pub bookkeeping_errors: usize,
}

enum EntryOutcome {
    Published,
    AlreadyPublished,
    Failed,
    SchemaRejected,
    BookkeepingError,
}

impl RelayReport {
    fn tally(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Published => self.published += 1,
            EntryOutcome::AlreadyPublished => self.already_published += 1,
            EntryOutcome::Failed => self.failed += 1,
            EntryOutcome::SchemaRejected => self.schema_rejected += 1,
            EntryOutcome::BookkeepingError => self.bookkeeping_errors += 1,
        }
    }
}

/// Worker that publishes pending outbox entries.
pub struct OutboxRelay {
    outbox: Arc<dyn OutboxRepository>,
    producer: Arc<dyn MessageProducer>,
    config: OutboxRelayConfig,
}

impl OutboxRelay {
    pub fn new(outbox: Arc<dyn OutboxRepository>, producer: Arc<dyn MessageProducer>) -> Self {
        Self::with_config(outbox, producer, OutboxRelayConfig::default())
    }

    pub fn with_config(
        outbox: Arc<dyn OutboxRepository>,
        producer: Arc<dyn MessageProducer>,
        config: OutboxRelayConfig,
    ) -> Self {
        Self {
            outbox,
            producer,
            config,
        }
    }

    pub fn config(&self) -> &OutboxRelayConfig {
        &self.config
    }

    /// Run passes on a fixed interval until shutdown is signalled.
    ///
    /// A pass that errors or times out is logged and the loop waits for the
    /// next tick. Shutdown is observed between passes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "Outbox relay started"
        );

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

        tracing::info!("Outbox relay stopped");
    }

    /// One pass bounded by `pass_timeout`. Returns the report if it finished.
    pub async fn run_pass_with_deadline(&self) -> Option<RelayReport> {
        match time::timeout(self.config.pass_timeout, self.run_pass()).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Outbox relay pass failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.pass_timeout.as_secs(),
                    "Outbox relay pass timed out, unmarked entries stay pending"
                );
                None
            }
        }
    }

    /// Fetch one batch and publish it with bounded concurrency.
    ///
    /// Only the batch read can fail the pass. Per-entry failures are recorded
    /// on the entry and counted in the report.
    #[tracing::instrument(skip(self), fields(fetched = tracing::field::Empty))]
    pub async fn run_pass(&self) -> Result<RelayReport, DomainError> {
        let entries = self
            .outbox
            .fetch_pending(self.config.batch_size, self.config.max_retries)
            .await?;

        let mut report = RelayReport {
            fetched: entries.len(),
            ..RelayReport::default()
        };
        tracing::Span::current().record("fetched", entries.len() as u64);

        if entries.is_empty() {
            return Ok(report);
        }

        let outcomes: Vec<EntryOutcome> = stream::iter(entries)
            .map(|entry| self.relay_entry(entry))
            .buffer_unordered(self.config.publish_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.tally(outcome);
        }

        tracing::info!(
            fetched = report.fetched,
            published = report.published,
            already_published = report.already_published,
            failed = report.failed,
            schema_rejected = report.schema_rejected,
            bookkeeping_errors = report.bookkeeping_errors,
            "Outbox relay pass complete"
        );
        Ok(report)
    }

    async fn relay_entry(&self, entry: OutboxEntry) -> EntryOutcome {
        match self.deliver(&entry).await {
            Ok(()) => match self.outbox.mark_published(entry.id).await {
                Ok(true) => {
                    tracing::debug!(outbox_id = %entry.id, aggregate_id = %entry.aggregate_id, "Published");
                    EntryOutcome::Published
                }
                Ok(false) => {
                    tracing::debug!(outbox_id = %entry.id, "Entry already marked by another pass");
                    EntryOutcome::AlreadyPublished
                }
                Err(e) => {
                    tracing::error!(
                        outbox_id = %entry.id,
                        error = %e,
                        "Published but failed to mark, entry will be sent again"
                    );
                    EntryOutcome::BookkeepingError
                }
            },
            Err(failure) => {
                let schema = failure.is_schema();
                let retry_count = entry.retry_count.saturating_add(1);
                if schema {
                    tracing::error!(
                        outbox_id = %entry.id,
                        event_type = %entry.event_type,
                        retry_count,
                        "No route for outbox entry"
                    );
                } else {
                    tracing::warn!(
                        outbox_id = %entry.id,
                        retry_count,
                        max_retries = self.config.max_retries,
                        error = %failure,
                        "Outbox publish failed"
                    );
                }

                match self.outbox.record_failure(entry.id, &failure.to_string()).await {
                    Ok(_) if schema => EntryOutcome::SchemaRejected,
                    Ok(_) => EntryOutcome::Failed,
                    Err(e) => {
                        tracing::error!(outbox_id = %entry.id, error = %e, "Failed to record delivery failure");
                        EntryOutcome::BookkeepingError
                    }
                }
            }
        }
    }

    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), DeliveryFailure> {
        let schema_error = || DeliveryFailure::Schema {
            event_type: entry.event_type.to_string(),
        };
        let topic = self
            .config
            .topics
            .topic_for(&entry.event_type)
            .ok_or_else(schema_error)?;
        let payload = serde_json::to_vec(&entry.payload).map_err(|_| schema_error())?;

        let message = OutboundMessage {
            topic: topic.to_string(),
            key: entry.aggregate_id.clone(),
            payload,
            headers: MessageHeaders {
                event_type: entry.event_type.as_str().to_string(),
                event_version: EVENT_VERSION.to_string(),
                source: self.config.source.clone(),
                correlation_id: entry.aggregate_id.clone(),
                message_id: Uuid::new_v4().to_string(),
            },
        };

        self.producer
            .publish(message)
            .await
            .map_err(|e| DeliveryFailure::Publish(e.to_string()))
    }
}
