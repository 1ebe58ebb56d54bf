//! Connectivity check of the content database and the object store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use contentops_core::traits::content::ContentStore;
use contentops_core::types::HealthStatus;
use contentops_storage::StorageClient;

/// Pings both external collaborators.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    store: Arc<dyn ContentStore>,
    storage: StorageClient,
}

impl HealthChecker {
    /// Create a checker.
    pub fn new(store: Arc<dyn ContentStore>, storage: StorageClient) -> Self {
        Self { store, storage }
    }

    /// Run one check. The result is fresh on every call.
    pub async fn check(&self) -> HealthStatus {
        let database_reachable = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Database health check failed");
                false
            }
        };
        let storage_reachable = self.storage.ping().await;

        let status = HealthStatus {
            database_reachable,
            storage_reachable,
            checked_at: Utc::now(),
        };

        if status.is_healthy() {
            info!("Health check passed, all services healthy");
        } else {
            warn!(
                database = database_reachable,
                storage = storage_reachable,
                "Health check found unreachable services"
            );
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use contentops_database::InMemoryContentStore;
    use contentops_storage::providers::MemoryObjectStore;

    use super::*;

    #[tokio::test]
    async fn test_reports_each_collaborator() {
        let db = InMemoryContentStore::new();
        let objects = Arc::new(MemoryObjectStore::new());
        let checker = HealthChecker::new(
            Arc::new(db.clone()),
            StorageClient::new(objects.clone()),
        );

        assert!(checker.check().await.is_healthy());

        db.set_unreachable(true);
        let status = checker.check().await;
        assert!(!status.database_reachable);
        assert!(status.storage_reachable);

        db.set_unreachable(false);
        objects.set_unavailable(true);
        let status = checker.check().await;
        assert!(status.database_reachable);
        assert!(!status.storage_reachable);
    }
}
