//! Built-in job actions and the default job set.

pub mod backup;
pub mod cleanup;
pub mod health;
pub mod sync;

use std::sync::Arc;

use tracing::info;

use contentops_core::config::SchedulerConfig;
use contentops_core::result::AppResult;

use crate::cadence::Cadence;
use crate::scheduler::SchedulerCore;
use crate::services::Services;

pub use backup::BackupJob;
pub use cleanup::CleanupJob;
pub use health::HealthCheckJob;
pub use sync::ContentSyncJob;

/// Daily database backup.
pub const BACKUP_JOB: &str = "backup";
/// Periodic cross-site synchronization.
pub const CONTENT_SYNC_JOB: &str = "content_sync";
/// Weekly local and remote retention cleanup.
pub const CLEANUP_JOB: &str = "cleanup";
/// Periodic connectivity check.
pub const HEALTH_CHECK_JOB: &str = "health_check";

/// Register the four standard jobs with cadences from `config`.
pub fn register_default_jobs(
    core: &mut SchedulerCore,
    services: &Services,
    config: &SchedulerConfig,
) -> AppResult<()> {
    core.register(
        BACKUP_JOB,
        Cadence::Daily {
            at: config.backup_at()?,
        },
        Arc::new(BackupJob::new(services.backup.clone())),
    )?;
    core.register(
        CONTENT_SYNC_JOB,
        Cadence::EveryHours(config.sync_interval_hours),
        Arc::new(ContentSyncJob::new(services.sync.clone())),
    )?;
    core.register(
        CLEANUP_JOB,
        Cadence::Weekly {
            day: config.cleanup_weekday()?,
            at: config.cleanup_at()?,
        },
        Arc::new(CleanupJob::new(services.backup.clone())),
    )?;
    core.register(
        HEALTH_CHECK_JOB,
        Cadence::EveryMinutes(config.health_interval_minutes),
        Arc::new(HealthCheckJob::new(services.health.clone())),
    )?;

    info!(jobs = core.len(), "Scheduled jobs configured");
    Ok(())
}
