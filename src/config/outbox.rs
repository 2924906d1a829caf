//! Outbox relay and retention configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Relay and sweeper tuning
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    /// Entries fetched per relay pass
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Attempts before an entry is considered stuck
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Concurrent publishes within a pass
    #[serde(default = "default_publish_concurrency")]
    pub publish_concurrency: usize,

    /// Seconds between relay passes
    #[serde(default = "default_relay_interval")]
    pub relay_interval_secs: u64,

    /// Deadline for a single relay pass in seconds
    #[serde(default = "default_relay_timeout")]
    pub relay_timeout_secs: u64,

    /// Days a published entry is kept
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Deadline for a single sweep in seconds
    #[serde(default = "default_sweep_timeout")]
    pub sweep_timeout_secs: u64,

    /// Stuck entries logged per sweep
    #[serde(default = "default_stuck_sample_size")]
    pub stuck_sample_size: u32,
}

impl OutboxConfig {
    pub fn relay_interval(&self) -> Duration {
        Duration::from_secs(self.relay_interval_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn sweep_timeout(&self) -> Duration {
        Duration::from_secs(self.sweep_timeout_secs)
    }

    /// Validate outbox configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive: [(&'static str, u64); 8] = [
            ("batch_size", u64::from(self.batch_size)),
            ("max_retries", u64::from(self.max_retries)),
            ("publish_concurrency", self.publish_concurrency as u64),
            ("relay_interval_secs", self.relay_interval_secs),
            ("relay_timeout_secs", self.relay_timeout_secs),
            ("retention_days", u64::from(self.retention_days)),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("sweep_timeout_secs", self.sweep_timeout_secs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ValidationError::MustBePositive(name));
        }
        if self.batch_size > 10_000 {
            return Err(ValidationError::BatchSizeTooLarge);
        }
        Ok(())
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            publish_concurrency: default_publish_concurrency(),
            relay_interval_secs: default_relay_interval(),
            relay_timeout_secs: default_relay_timeout(),
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval(),
            sweep_timeout_secs: default_sweep_timeout(),
            stuck_sample_size: default_stuck_sample_size(),
        }
    }
}

fn default_batch_size() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    5
}

fn default_publish_concurrency() -> usize {
    100
}

fn default_relay_interval() -> u64 {
    60
}

fn default_relay_timeout() -> u64 {
    60
}

fn default_retention_days() -> u32 {
    7
}

fn default_sweep_interval() -> u64 {
    86_400
}

fn default_sweep_timeout() -> u64 {
    120
}

fn default_stuck_sample_size() -> u32 {
    10
}
