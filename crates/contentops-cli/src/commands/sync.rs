//! Content synchronization CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use contentops_core::error::AppError;
use contentops_worker::Services;

/// Arguments for sync commands
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Sync subcommand
    #[command(subcommand)]
    pub command: SyncCommand,
}

/// Sync subcommands
#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Run every synchronization step in both directions
    Full,
    /// Copy recent posts from one site to the other as featured content
    Featured {
        /// Source site name (e.g. `site1`)
        source: String,
        /// Target site name (e.g. `site2`)
        target: String,
    },
    /// Delete revisions older than the retention window
    CleanupRevisions {
        /// Site table prefix (e.g. `site1_`)
        prefix: String,
        /// Age threshold in days (defaults to `sync.revision_retention_days`)
        #[arg(short, long)]
        days: Option<u32>,
    },
}

/// Execute sync commands
pub async fn execute(
    args: &SyncArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = &services.sync;

    let result = match &args.command {
        SyncCommand::Full => {
            let summary = manager.run_full_sync().await;
            output::print_summary(&summary, format);
            if summary.is_success() {
                output::print_success("Full sync completed");
                Ok(())
            } else {
                Err(AppError::sync(format!(
                    "Full sync finished with failed steps: {}",
                    summary.failed_steps.join(", ")
                )))
            }
        }
        SyncCommand::Featured { source, target } => manager
            .sync_featured_content(source, target)
            .await
            .map(|inserted| {
                output::print_success(&format!(
                    "Synced {inserted} featured post(s) from {source} to {target}"
                ));
            }),
        SyncCommand::CleanupRevisions { prefix, days } => {
            let days = days.unwrap_or(services.config.sync.revision_retention_days);
            manager
                .cleanup_old_revisions(prefix, days)
                .await
                .map(|deleted| {
                    output::print_success(&format!(
                        "Deleted {deleted} revision(s) older than {days} day(s) from {prefix}posts"
                    ));
                })
        }
    };

    services.content.close().await;
    result
}
