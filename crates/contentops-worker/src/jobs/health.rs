//! Scheduled health check.

use async_trait::async_trait;
use serde_json::Value;

use crate::executor::{JobAction, JobExecutionError};
use crate::health::HealthChecker;

/// Checks database and storage connectivity.
///
/// Fails when either collaborator is unreachable so the outcome shows up
/// in the scheduler status.
#[derive(Debug)]
pub struct HealthCheckJob {
    checker: HealthChecker,
}

impl HealthCheckJob {
    /// Create a health check job
    pub fn new(checker: HealthChecker) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl JobAction for HealthCheckJob {
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        tracing::debug!("Running health check");

        let status = self.checker.check().await;
        if !status.is_healthy() {
            return Err(JobExecutionError::Failed(format!(
                "Health check issues: database={}, storage={}",
                status.database_reachable, status.storage_reachable
            )));
        }

        Ok(Some(serde_json::json!({
            "task": "health_check",
            "database_reachable": status.database_reachable,
            "storage_reachable": status.storage_reachable,
            "checked_at": status.checked_at.to_rfc3339(),
        })))
    }
}
