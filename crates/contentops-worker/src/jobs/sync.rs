//! Scheduled content synchronization.

use async_trait::async_trait;
use serde_json::Value;

use crate::executor::{JobAction, JobExecutionError};
use crate::sync::SyncManager;

/// Runs a full bidirectional sync.
#[derive(Debug)]
pub struct ContentSyncJob {
    manager: SyncManager,
}

impl ContentSyncJob {
    /// Create a content sync job
    pub fn new(manager: SyncManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl JobAction for ContentSyncJob {
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        tracing::info!("Starting scheduled content synchronization");

        let summary = self.manager.run_full_sync().await;
        if !summary.is_success() {
            return Err(JobExecutionError::Failed(format!(
                "Sync steps failed: {}",
                summary.failed_steps.join(", ")
            )));
        }

        Ok(Some(serde_json::to_value(&summary).map_err(contentops_core::AppError::from)?))
    }
}
