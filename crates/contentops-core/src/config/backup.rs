//! Backup and synchronization configuration.

use serde::{Deserialize, Serialize};

/// Local backup artifacts and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory where dump artifacts are written.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Artifacts older than this many days are pruned, locally and remotely.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Dump executable.
    #[serde(default = "default_dump_command")]
    pub dump_command: String,
    /// Object key prefix for uploaded artifacts.
    #[serde(default = "default_remote_prefix")]
    pub remote_prefix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            retention_days: default_retention_days(),
            dump_command: default_dump_command(),
            remote_prefix: default_remote_prefix(),
        }
    }
}

/// Content synchronization windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How far back posts and registrations are considered "recent".
    #[serde(default = "default_recent_hours")]
    pub recent_hours: u32,
    /// Revisions older than this many days are deleted during a full sync.
    #[serde(default = "default_revision_retention_days")]
    pub revision_retention_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            recent_hours: default_recent_hours(),
            revision_retention_days: default_revision_retention_days(),
        }
    }
}

fn default_directory() -> String {
    "/app/backups".to_string()
}

fn default_retention_days() -> u32 {
    30
}

fn default_dump_command() -> String {
    "mysqldump".to_string()
}

fn default_remote_prefix() -> String {
    "backups/".to_string()
}

fn default_recent_hours() -> u32 {
    24
}

fn default_revision_retention_days() -> u32 {
    30
}
