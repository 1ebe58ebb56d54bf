//! Backup manager: produce a local dump, upload it, prune old artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use contentops_core::config::BackupConfig;
use contentops_core::error::{AppError, ErrorKind};
use contentops_core::result::AppResult;
use contentops_core::traits::backup::BackupProducer;
use contentops_storage::StorageClient;

/// Artifact file name prefix.
pub const BACKUP_FILE_PREFIX: &str = "content_ops_backup_";

/// Artifact file extension.
pub const BACKUP_FILE_EXTENSION: &str = "sql";

/// Outcome of a local retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Artifacts removed.
    pub deleted: usize,
    /// Artifacts that were expired but could not be removed.
    pub failed: usize,
}

/// Outcome of [`BackupManager::full_backup_process`].
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    /// Local artifact.
    pub artifact: PathBuf,
    /// Object key of the uploaded artifact.
    pub key: String,
    /// Local retention pass.
    pub cleanup: CleanupReport,
}

/// Creates, uploads, and prunes database backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    producer: Arc<dyn BackupProducer>,
    storage: StorageClient,
    directory: PathBuf,
    retention_days: u32,
    remote_prefix: String,
}

impl BackupManager {
    /// Create a manager writing artifacts under `config.directory`.
    pub fn new(
        producer: Arc<dyn BackupProducer>,
        storage: StorageClient,
        config: &BackupConfig,
    ) -> Self {
        Self {
            producer,
            storage,
            directory: PathBuf::from(&config.directory),
            retention_days: config.retention_days,
            remote_prefix: config.remote_prefix.clone(),
        }
    }

    /// Local artifact directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Configured retention window in days.
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Key prefix of uploaded artifacts.
    pub fn remote_prefix(&self) -> &str {
        &self.remote_prefix
    }

    /// Dump the database (or only `tables`) to a new artifact.
    ///
    /// The name carries a timestamp to the second; a numeric suffix is
    /// added if that name is already taken. Fails with a backup error.
    pub async fn create_backup(&self, tables: Option<&[String]>) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Backup,
                    format!(
                        "Cannot create backup directory '{}'",
                        self.directory.display()
                    ),
                    e,
                )
            })?;

        let path = self.unique_artifact_path(Utc::now());
        let tables = tables.unwrap_or_default();
        info!(path = %path.display(), tables = tables.len(), "Creating database backup");

        self.producer.dump(&path, tables).await.map_err(|e| {
            if e.is(ErrorKind::Backup) {
                e
            } else {
                AppError::backup(format!("Backup failed: {}", e.message))
            }
        })?;

        info!(path = %path.display(), "Backup created");
        Ok(path)
    }

    fn unique_artifact_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stem = format!("{BACKUP_FILE_PREFIX}{}", now.format("%Y%m%d_%H%M%S"));
        let mut path = self
            .directory
            .join(format!("{stem}.{BACKUP_FILE_EXTENSION}"));
        let mut suffix = 1;
        while path.exists() {
            path = self
                .directory
                .join(format!("{stem}_{suffix}.{BACKUP_FILE_EXTENSION}"));
            suffix += 1;
        }
        path
    }

    /// Upload an artifact under `<remote_prefix><filename>`. Returns the key.
    ///
    /// Fails with an upload error when the file is missing or the transfer
    /// fails.
    pub async fn upload_backup(&self, path: &Path) -> AppResult<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::upload(format!("Not a file: {}", path.display())))?;

        if !path.is_file() {
            error!(path = %path.display(), "Backup file not found");
            return Err(AppError::upload(format!(
                "Backup file not found: {}",
                path.display()
            )));
        }

        let key = format!("{}{file_name}", self.remote_prefix);
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "content-ops".to_string());
        metadata.insert("created-at".to_string(), Utc::now().to_rfc3339());

        if self.storage.upload(path, &key, Some(metadata)).await {
            info!(key = %key, "Backup uploaded");
            Ok(key)
        } else {
            Err(AppError::upload(format!("Failed to upload backup to '{key}'")))
        }
    }

    /// Delete local `*.sql` artifacts modified more than `retention_days` ago.
    ///
    /// Best-effort: a file that cannot be inspected or removed is logged and
    /// counted as failed, and the pass continues.
    pub async fn cleanup_old_backups(&self, retention_days: u32) -> CleanupReport {
        let mut report = CleanupReport::default();
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(u64::from(retention_days) * 86_400))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    directory = %self.directory.display(),
                    error = %e,
                    "Cannot read backup directory"
                );
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read backup directory entry");
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BACKUP_FILE_EXTENSION) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat backup");
                    report.failed += 1;
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!(path = %path.display(), "Deleted old backup");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete old backup");
                    report.failed += 1;
                }
            }
        }

        info!(
            deleted = report.deleted,
            failed = report.failed,
            retention_days,
            "Local backup cleanup finished"
        );
        report
    }

    /// Delete uploaded artifacts older than `retention_days`. Returns the
    /// number deleted.
    pub async fn cleanup_remote_backups(&self, retention_days: u32) -> usize {
        self.storage
            .cleanup_older_than(&self.remote_prefix, retention_days)
            .await
    }

    /// Create, upload, then prune local artifacts.
    ///
    /// The result reflects the upload. Cleanup always runs once an artifact
    /// exists and never turns a successful upload into a failure.
    pub async fn full_backup_process(&self) -> AppResult<BackupReport> {
        let artifact = self.create_backup(None).await?;
        let upload = self.upload_backup(&artifact).await;
        let cleanup = self.cleanup_old_backups(self.retention_days).await;
        let key = upload?;
        Ok(BackupReport {
            artifact,
            key,
            cleanup,
        })
    }
}
