//! Process wiring - Shared clients, logging, and run modes.
//!
//! `AppResources` owns the process-wide clients. The Kafka producer is only
//! created when a mode first asks for it, so `sweep-once` and `migrate` never
//! connect to the broker. `shutdown()` may be called any number of times.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::{watch, OnceCell};
use tracing_subscriber::EnvFilter;

use crate::adapters::http::{webhook_router, WebhookAppState};
use crate::adapters::{KafkaMessageProducer, PostgresPaymentStore, PrometheusMetricsCollector};
use crate::adapters::postgres::run_migrations;
use crate::application::handlers::ProcessPaymentWebhookHandler;
use crate::application::workers::{
    OutboxRelay, OutboxRelayConfig, RetentionSweeper, RetentionSweeperConfig,
};
use crate::config::{AppConfig, ConfigError, LogFormat, ServerConfig, ValidationError};
use crate::domain::foundation::DomainError;
use crate::ports::PublishError;

const PRODUCER_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that stop the process from starting or finishing a mode.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Broker setup failed: {0}")]
    Broker(#[from] PublishError),

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} pass did not complete")]
    PassFailed(&'static str),

    #[error("Resources already shut down")]
    Closed,

    #[error("Unknown run mode '{0}' (expected serve, relay-once, sweep-once, or migrate)")]
    UnknownMode(String),
}

// ════════════════════════════════════════════════════════════════════════════════
// Run Mode
// ════════════════════════════════════════════════════════════════════════════════

/// How the binary was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// HTTP intake plus relay and sweeper loops.
    #[default]
    Serve,
    /// One relay pass, then exit.
    RelayOnce,
    /// One retention sweep, then exit.
    SweepOnce,
    /// Apply migrations, then exit.
    Migrate,
}

impl FromStr for RunMode {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "serve" => Ok(RunMode::Serve),
            "relay-once" => Ok(RunMode::RelayOnce),
            "sweep-once" => Ok(RunMode::SweepOnce),
            "migrate" => Ok(RunMode::Migrate),
            other => Err(BootstrapError::UnknownMode(other.to_string())),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Logging
// ════════════════════════════════════════════════════════════════════════════════

/// Installs the global subscriber. `RUST_LOG` overrides `server.log_level`.
pub fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let result = match server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Shared Resources
// ════════════════════════════════════════════════════════════════════════════════

/// Process-wide clients.
pub struct AppResources {
    config: AppConfig,
    pool: PgPool,
    producer: OnceCell<Arc<KafkaMessageProducer>>,
    closed: AtomicBool,
}

impl AppResources {
    /// Opens the database pool. The broker is left untouched.
    pub async fn connect(config: AppConfig) -> Result<Self, BootstrapError> {
        let pool = config
            .database
            .pool_options()
            .connect(secrecy::ExposeSecret::expose_secret(&config.database.url))
            .await?;

        tracing::info!(
            max_connections = config.database.max_connections,
            "Database pool ready"
        );

        Ok(Self {
            config,
            pool,
            producer: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn payment_store(&self) -> Arc<PostgresPaymentStore> {
        Arc::new(PostgresPaymentStore::new(self.pool.clone()))
    }

    /// Returns the producer, creating it on first use.
    pub async fn producer(&self) -> Result<Arc<KafkaMessageProducer>, BootstrapError> {
        if self.is_closed() {
            return Err(BootstrapError::Closed);
        }
        let producer = self
            .producer
            .get_or_try_init(|| async {
                let producer = KafkaMessageProducer::new(&self.config.broker)?;
                tracing::info!(brokers = %self.config.broker.brokers, "Kafka producer created");
                Ok::<_, BootstrapError>(Arc::new(producer))
            })
            .await?;
        Ok(producer.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Flushes the producer if one was created and closes the pool.
    ///
    /// Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(producer) = self.producer.get() {
            let producer = producer.clone();
            let flushed =
                tokio::task::spawn_blocking(move || producer.flush(PRODUCER_FLUSH_TIMEOUT)).await;
            match flushed {
                Ok(Ok(())) => tracing::info!("Kafka producer flushed"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Kafka producer flush incomplete"),
                Err(e) => tracing::warn!(error = %e, "Kafka producer flush task failed"),
            }
        }

        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Modes
// ════════════════════════════════════════════════════════════════════════════════

/// Runs `mode` to completion, then releases shared resources.
pub async fn run(mode: RunMode, config: AppConfig) -> Result<(), BootstrapError> {
    let resources = AppResources::connect(config).await?;

    let result = match mode {
        RunMode::Migrate => run_migrations(resources.pool()).await.map_err(Into::into),
        RunMode::RelayOnce => relay_once(&resources).await,
        RunMode::SweepOnce => sweep_once(&resources).await,
        RunMode::Serve => serve(&resources).await,
    };

    resources.shutdown().await;
    result
}

async fn relay(resources: &AppResources) -> Result<OutboxRelay, BootstrapError> {
    let config = resources.config();
    let relay_config = OutboxRelayConfig::from_settings(
        &config.outbox,
        config.broker.source.clone(),
        config.broker.topic_map(),
    );
    Ok(OutboxRelay::with_config(
        resources.payment_store(),
        resources.producer().await?,
        relay_config,
    ))
}

fn sweeper(
    resources: &AppResources,
    metrics: PrometheusMetricsCollector,
) -> RetentionSweeper {
    RetentionSweeper::new(
        resources.payment_store(),
        Arc::new(metrics),
        RetentionSweeperConfig::from(&resources.config().outbox),
    )
}

async fn relay_once(resources: &AppResources) -> Result<(), BootstrapError> {
    let relay = relay(resources).await?;
    relay
        .run_pass_with_deadline()
        .await
        .map(|_| ())
        .ok_or(BootstrapError::PassFailed("Relay"))
}

async fn sweep_once(resources: &AppResources) -> Result<(), BootstrapError> {
    let metrics = PrometheusMetricsCollector::new(resources.config().server.service_name.clone())?;
    sweeper(resources, metrics)
        .run_pass_with_deadline()
        .await
        .map(|_| ())
        .ok_or(BootstrapError::PassFailed("Sweep"))
}

async fn serve(resources: &AppResources) -> Result<(), BootstrapError> {
    let config = resources.config();
    if config.database.run_migrations {
        run_migrations(resources.pool()).await?;
    }

    let metrics = PrometheusMetricsCollector::new(config.server.service_name.clone())?;
    let relay = Arc::new(relay(resources).await?);
    let sweeper = Arc::new(sweeper(resources, metrics.clone()));

    let state = WebhookAppState {
        webhook_handler: Arc::new(ProcessPaymentWebhookHandler::new(
            config.payment.verifier_registry(),
            resources.payment_store(),
        )),
        metrics,
    };
    let app = webhook_router(state, config.server.request_timeout());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let relay_task = tokio::spawn({
        let relay = relay.clone();
        let rx = shutdown_rx.clone();
        async move { relay.run(rx).await }
    });
    let sweeper_task = tokio::spawn({
        let sweeper = sweeper.clone();
        let rx = shutdown_rx.clone();
        async move { sweeper.run(rx).await }
    });

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Payment intake listening");

    let mut server_rx = shutdown_rx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_rx.wait_for(|stop| *stop).await;
        })
        .await?;

    for (name, task) in [("relay", relay_task), ("sweeper", sweeper_task)] {
        if let Err(e) = task.await {
            tracing::error!(worker = name, error = %e, "Worker task panicked");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
