//! Long-running scheduler daemon.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use contentops_core::result::AppResult;

use crate::services::Services;

/// Run the scheduler until `shutdown` flips to `true`.
///
/// One health check runs immediately, then the default jobs are polled
/// every `scheduler.poll_interval_seconds`. Job failures are logged and
/// never end the loop.
pub async fn run(services: Services, shutdown: watch::Receiver<bool>) -> AppResult<()> {
    info!("Starting content operations scheduler");

    let status = services.health.check().await;
    if !status.is_healthy() {
        warn!(
            database = status.database_reachable,
            storage = status.storage_reachable,
            "Startup health check reported issues, continuing"
        );
    }

    let mut core = services.scheduler()?;
    for row in core.status() {
        info!(
            job = %row.name,
            cadence = %row.cadence,
            next_run = %row.next_run,
            "Job scheduled"
        );
    }

    let interval = Duration::from_secs(services.config.scheduler.poll_interval_seconds);
    core.poll_loop(interval, shutdown).await;

    services.content.close().await;
    info!("Scheduler stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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
