//! Backup CLI commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{self, OutputFormat};
use contentops_core::error::AppError;
use contentops_worker::Services;

/// Arguments for backup commands
#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Backup subcommand
    #[command(subcommand)]
    pub command: BackupCommand,
}

/// Backup subcommands
#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Dump the database, upload the artifact, and prune old local artifacts
    Create {
        /// Only dump these tables (repeatable)
        #[arg(short, long = "table")]
        tables: Vec<String>,
        /// Keep the artifact local
        #[arg(long)]
        no_upload: bool,
        /// Skip the local retention pass
        #[arg(long)]
        no_cleanup: bool,
    },
    /// Upload an existing artifact
    Upload {
        /// Path of the artifact
        path: PathBuf,
    },
    /// Delete local and remote backups past the retention window
    Cleanup {
        /// Retention in days (defaults to `backup.retention_days`)
        #[arg(short, long)]
        retention_days: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
struct CreateSummary {
    artifact: String,
    key: Option<String>,
    local_deleted: Option<usize>,
    local_failed: Option<usize>,
}

#[derive(Debug, Serialize)]
struct CleanupSummary {
    retention_days: u32,
    local_deleted: usize,
    local_failed: usize,
    remote_deleted: usize,
}

/// Execute backup commands
pub async fn execute(
    args: &BackupArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = &services.backup;

    match &args.command {
        BackupCommand::Create {
            tables,
            no_upload,
            no_cleanup,
        } => {
            let selection = (!tables.is_empty()).then_some(tables.as_slice());
            let artifact = manager.create_backup(selection).await?;
            output::print_success(&format!("Backup created: {}", artifact.display()));

            let upload = if *no_upload {
                None
            } else {
                Some(manager.upload_backup(&artifact).await)
            };
            let cleanup = if *no_cleanup {
                None
            } else {
                Some(manager.cleanup_old_backups(manager.retention_days()).await)
            };

            let key = match upload {
                Some(Ok(key)) => Some(key),
                Some(Err(e)) => return Err(e),
                None => None,
            };

            output::print_summary(
                &CreateSummary {
                    artifact: artifact.display().to_string(),
                    key,
                    local_deleted: cleanup.as_ref().map(|c| c.deleted),
                    local_failed: cleanup.as_ref().map(|c| c.failed),
                },
                format,
            );
        }
        BackupCommand::Upload { path } => {
            let key = manager.upload_backup(path).await?;
            output::print_success(&format!("Uploaded {} to {}", path.display(), key));
        }
        BackupCommand::Cleanup { retention_days } => {
            let days = retention_days.unwrap_or(manager.retention_days());
            let local = manager.cleanup_old_backups(days).await;
            let remote_deleted = manager.cleanup_remote_backups(days).await;

            if local.failed > 0 {
                output::print_warning(&format!(
                    "{} local backup(s) could not be removed",
                    local.failed
                ));
            }
            output::print_success("Backup cleanup completed");
            output::print_summary(
                &CleanupSummary {
                    retention_days: days,
                    local_deleted: local.deleted,
                    local_failed: local.failed,
                    remote_deleted,
                },
                format,
            );
        }
    }

    Ok(())
}
