//! Object storage CLI commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use contentops_core::error::AppError;
use contentops_storage::client::DEFAULT_MAX_KEYS;
use contentops_worker::Services;

/// Arguments for storage commands
#[derive(Debug, Args)]
pub struct StorageArgs {
    /// Storage subcommand
    #[command(subcommand)]
    pub command: StorageCommand,
}

/// Storage subcommands
#[derive(Debug, Subcommand)]
pub enum StorageCommand {
    /// Upload a local file
    Upload {
        /// Local file
        path: PathBuf,
        /// Destination key
        key: String,
    },
    /// Download an object to a local file
    Download {
        /// Object key
        key: String,
        /// Destination file
        path: PathBuf,
    },
    /// List objects
    List {
        /// Key prefix
        #[arg(short, long, default_value = "")]
        prefix: String,
        /// Maximum number of keys
        #[arg(short, long, default_value_t = DEFAULT_MAX_KEYS)]
        max_keys: i32,
    },
}

/// Object display row
#[derive(Debug, Serialize, Tabled)]
struct ObjectRow {
    /// Key
    key: String,
    /// Size
    size: String,
    /// Last modified
    last_modified: String,
    /// ETag
    etag: String,
}

/// Execute storage commands
pub async fn execute(
    args: &StorageArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    let storage = &services.storage;

    match &args.command {
        StorageCommand::Upload { path, key } => {
            if !storage.upload(path, key, None).await {
                return Err(AppError::upload(format!(
                    "Failed to upload {} to {}",
                    path.display(),
                    key
                )));
            }
            output::print_success(&format!("Uploaded {} to {}", path.display(), key));
        }
        StorageCommand::Download { key, path } => {
            if !storage.download(key, path).await {
                return Err(AppError::storage(format!(
                    "Failed to download {} to {}",
                    key,
                    path.display()
                )));
            }
            output::print_success(&format!("Downloaded {} to {}", key, path.display()));
        }
        StorageCommand::List { prefix, max_keys } => {
            let rows: Vec<ObjectRow> = storage
                .list(prefix, *max_keys)
                .await
                .into_iter()
                .map(|o| ObjectRow {
                    key: o.key,
                    size: output::format_bytes(o.size),
                    last_modified: o
                        .last_modified
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                    etag: o.etag.unwrap_or_default(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
