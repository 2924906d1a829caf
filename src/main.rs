//! payment-outbox binary.
//!
//! Usage: `payment-outbox [serve|relay-once|sweep-once|migrate]`

use std::process::ExitCode;

use payment_outbox::bootstrap::{self, RunMode};
use payment_outbox::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load_validated() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    bootstrap::init_tracing(&config.server);

    let mode = match std::env::args().nth(1).map(|arg| arg.parse::<RunMode>()) {
        None => RunMode::default(),
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            tracing::error!(error = %e, "Invalid arguments");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        ?mode,
        service = %config.server.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting payment-outbox"
    );

    match bootstrap::run(mode, config).await {
        Ok(()) => {
            tracing::info!(?mode, "Exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(?mode, error = %e, "Exited with error");
            ExitCode::FAILURE
        }
    }
}
