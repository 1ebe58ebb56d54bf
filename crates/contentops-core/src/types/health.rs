//! Health status of the external collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one health check cycle. Never cached beyond the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `SELECT 1` succeeded against the content database.
    pub database_reachable: bool,
    /// A one-key listing succeeded against the object store.
    pub storage_reachable: bool,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    /// Both collaborators reachable.
    pub fn is_healthy(&self) -> bool {
        self.database_reachable && self.storage_reachable
    }
}
