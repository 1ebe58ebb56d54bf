//! CLI command definitions and dispatch.

pub mod backup;
pub mod scheduler;
pub mod storage;
pub mod sync;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use contentops_core::config::AppConfig;
use contentops_core::error::AppError;
use contentops_worker::Services;

/// Content Ops: scheduled backups and cross-site content synchronization
#[derive(Debug, Parser)]
#[command(name = "contentops", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (selects `config/<env>.toml`)
    #[arg(short, long, default_value = "production")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database backups
    Backup(backup::BackupArgs),
    /// Cross-site content synchronization
    Sync(sync::SyncArgs),
    /// Job scheduler
    Scheduler(scheduler::SchedulerArgs),
    /// Object storage
    Storage(storage::StorageArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let services = connect(&self.env).await?;
        match &self.command {
            Commands::Backup(args) => backup::execute(args, &services, self.format).await,
            Commands::Sync(args) => sync::execute(args, &services, self.format).await,
            Commands::Scheduler(args) => scheduler::execute(args, &services, self.format).await,
            Commands::Storage(args) => storage::execute(args, &services, self.format).await,
        }
    }
}

/// Helper: load configuration, set up logging, and connect to the external
/// services
pub async fn connect(env: &str) -> Result<Services, AppError> {
    let config = AppConfig::load(env)?;
    crate::logging::init(&config.logging);
    Services::from_config(config).await
}
