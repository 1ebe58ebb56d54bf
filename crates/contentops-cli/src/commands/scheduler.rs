//! Scheduler CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::watch;

use crate::output::{self, OutputFormat};
use contentops_core::error::AppError;
use contentops_worker::Services;
use contentops_worker::daemon;
use contentops_worker::scheduler::JobStatusRow;

/// Arguments for scheduler commands
#[derive(Debug, Args)]
pub struct SchedulerArgs {
    /// Scheduler subcommand
    #[command(subcommand)]
    pub command: SchedulerCommand,
}

/// Scheduler subcommands
#[derive(Debug, Subcommand)]
pub enum SchedulerCommand {
    /// Run the scheduler in the foreground until interrupted
    Start,
    /// Run one job immediately
    RunJob {
        /// Job name (`backup`, `content_sync`, `cleanup`, `health_check`)
        name: String,
    },
    /// Show the registered jobs and their schedule
    Status,
}

/// Job display row
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    /// Job name
    name: String,
    /// Cadence
    cadence: String,
    /// Last run
    last_run: String,
    /// Next run
    next_run: String,
    /// Last outcome
    last_outcome: String,
}

impl From<JobStatusRow> for JobRow {
    fn from(row: JobStatusRow) -> Self {
        Self {
            name: row.name,
            cadence: row.cadence,
            last_run: row
                .last_run
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string()),
            next_run: row.next_run.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            last_outcome: row
                .last_outcome
                .map(|o| o.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Execute scheduler commands
pub async fn execute(
    args: &SchedulerArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        SchedulerCommand::Start => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                daemon::shutdown_signal().await;
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            });
            daemon::run(services.clone(), shutdown_rx).await?;
            output::print_success("Scheduler stopped");
        }
        SchedulerCommand::RunJob { name } => {
            let mut core = services.scheduler()?;
            let result = core.run_by_name(name).await;
            services.content.close().await;
            let result = result?;

            if let Some(summary) = &result.summary {
                output::print_summary(summary, format);
            }
            if result.is_success() {
                output::print_success(&format!(
                    "Job '{}' succeeded in {} ms",
                    result.job_name,
                    result.duration_ms()
                ));
            } else {
                return Err(AppError::internal(format!(
                    "Job '{}' failed: {}",
                    result.job_name,
                    result.error.as_deref().unwrap_or("unknown error")
                )));
            }
        }
        SchedulerCommand::Status => {
            let core = services.scheduler()?;
            let rows: Vec<JobRow> = core.status().into_iter().map(JobRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
