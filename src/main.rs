//! Content Ops daemon
//!
//! Loads configuration, connects to the external services, and runs the
//! job scheduler until Ctrl+C or SIGTERM.

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use contentops_core::config::AppConfig;
use contentops_core::error::AppError;
use contentops_worker::{Services, daemon};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Daemon error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration for `CONTENTOPS_ENV` (default `production`)
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("CONTENTOPS_ENV").unwrap_or_else(|_| "production".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Connect, then schedule until shutdown
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Content Ops v{}", env!("CARGO_PKG_VERSION"));

    let services = Services::from_config(config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        daemon::shutdown_signal().await;
        tracing::info!("Shutdown signal received, stopping scheduler...");
        let _ = shutdown_tx.send(true);
    });

    daemon::run(services, shutdown_rx).await?;

    tracing::info!("Content Ops daemon shut down gracefully");
    Ok(())
}
