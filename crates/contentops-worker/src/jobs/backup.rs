//! Scheduled database backup.

use async_trait::async_trait;
use serde_json::Value;

use crate::backup::BackupManager;
use crate::executor::{JobAction, JobExecutionError};

/// Runs the full backup process: create, upload, local cleanup.
#[derive(Debug)]
pub struct BackupJob {
    manager: BackupManager,
}

impl BackupJob {
    /// Create a backup job
    pub fn new(manager: BackupManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl JobAction for BackupJob {
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        tracing::info!("Starting scheduled database backup");

        let report = self
            .manager
            .full_backup_process()
            .await
            .map_err(|e| JobExecutionError::Failed(format!("Backup failed: {e}")))?;

        tracing::info!(key = %report.key, "Scheduled database backup completed");

        Ok(Some(serde_json::json!({
            "task": "backup",
            "artifact": report.artifact.display().to_string(),
            "key": report.key,
            "local_deleted": report.cleanup.deleted,
            "local_failed": report.cleanup.failed,
        })))
    }
}
