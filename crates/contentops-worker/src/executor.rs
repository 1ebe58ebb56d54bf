//! Job actions and execution results.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use contentops_core::error::AppError;

/// Work performed when a scheduled job fires.
#[async_trait]
pub trait JobAction: Send + Sync + std::fmt::Debug {
    /// Run the job once, returning an optional summary.
    async fn run(&self) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The job ran and reported failure
    #[error("Job failed: {0}")]
    Failed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Adapter turning an async closure into a [`JobAction`].
pub struct FnAction<F> {
    label: &'static str,
    f: F,
}

impl<F> FnAction<F> {
    /// Wrap `f`; `label` is used in debug output.
    pub fn new(label: &'static str, f: F) -> Self {
        Self { label, f }
    }
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").field("label", &self.label).finish()
    }
}

#[async_trait]
impl<F, Fut> JobAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, JobExecutionError>> + Send,
{
    async fn run(&self) -> Result<Option<Value>, JobExecutionError> {
        (self.f)().await
    }
}

/// How one execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// The action returned normally.
    Success,
    /// The action returned an error or panicked.
    Failure,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Record of one job execution. Logged, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Unique ID of this run.
    pub run_id: Uuid,
    /// Name of the job.
    pub job_name: String,
    /// When the action started.
    pub started_at: DateTime<Utc>,
    /// When the action returned.
    pub finished_at: DateTime<Utc>,
    /// Success or failure.
    pub outcome: JobOutcome,
    /// Failure cause.
    pub error: Option<String>,
    /// Summary returned by the action.
    pub summary: Option<Value>,
}

impl ExecutionResult {
    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome == JobOutcome::Success
    }

    /// Wall time of the run in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
