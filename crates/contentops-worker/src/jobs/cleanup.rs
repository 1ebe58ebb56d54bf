//! Scheduled retention cleanup of local and remote backups.

use async_trait::async_trait;
use serde_json::Value;

use crate::backup::BackupManager;
use crate::executor::{JobAction, JobExecutionError};

/// Prunes local artifacts and uploaded backups past the retention window.
///
/// Best-effort: individual deletion failures are logged and counted, and
/// the job still reports success.
#[derive(Debug)]
pub struct CleanupJob {
    manager: BackupManager,
}

impl CleanupJob {
    /// Create a cleanup job
    pub fn new(manager: BackupManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl JobAction for CleanupJob {
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        tracing::info!("Starting scheduled cleanup job");

        let retention_days = self.manager.retention_days();
        let local = self.manager.cleanup_old_backups(retention_days).await;
        let remote_deleted = self.manager.cleanup_remote_backups(retention_days).await;

        tracing::info!(
            local_deleted = local.deleted,
            local_failed = local.failed,
            remote_deleted,
            "Scheduled cleanup job completed"
        );

        Ok(Some(serde_json::json!({
            "task": "cleanup",
            "retention_days": retention_days,
            "local_deleted": local.deleted,
            "local_failed": local.failed,
            "remote_deleted": remote_deleted,
        })))
    }
}
