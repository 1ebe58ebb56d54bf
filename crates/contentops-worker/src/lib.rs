//! Scheduling and execution of the Content Ops automation jobs.
//!
//! This crate provides:
//! - The scheduler core: a registry of named jobs with cadences, due-job
//!   selection, isolated execution, and the polling loop
//! - The backup manager and the `mysqldump` backup producer
//! - The sync manager for cross-site content and user synchronization
//! - The health checker
//! - Built-in job actions and the service wiring shared by the binaries

pub mod backup;
pub mod cadence;
pub mod clock;
pub mod daemon;
pub mod dump;
pub mod executor;
pub mod health;
pub mod jobs;
pub mod scheduler;
pub mod services;
pub mod sync;

pub use backup::BackupManager;
pub use cadence::Cadence;
pub use scheduler::SchedulerCore;
pub use services::Services;
pub use sync::SyncManager;
