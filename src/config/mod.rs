//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PAYMENT_OUTBOX` prefix
//! and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use payment_outbox::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod broker;
mod database;
mod error;
mod outbox;
mod payment;
mod server;

pub use broker::{BrokerConfig, TopicConfig};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use outbox::OutboxConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Built once at startup with [`AppConfig::load()`] and validated before any
/// connection is opened.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server, logging, and service identity
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Kafka connection and topics
    pub broker: BrokerConfig,

    /// Relay and retention tuning
    #[serde(default)]
    pub outbox: OutboxConfig,

    /// Provider callback keys
    #[serde(default)]
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PAYMENT_OUTBOX` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `PAYMENT_OUTBOX__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYMENT_OUTBOX__BROKER__TOPICS__PAYMENT_FAILED=...` -> `broker.topics.payment_failed`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYMENT_OUTBOX")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.broker.validate()?;
        self.outbox.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    /// Loads and validates in one step
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }
}
