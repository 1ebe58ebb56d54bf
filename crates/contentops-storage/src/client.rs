//! Storage client used by the backup manager and the scheduler.
//!
//! Every operation reports failure through its return value (`false`, an
//! empty list, `None`) and logs the cause. Callers decide whether a failed
//! transfer is fatal.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use contentops_core::ErrorKind;
use contentops_core::traits::storage::{ObjectInfo, ObjectMetadata, ObjectStore};

/// Default page size for listings.
pub const DEFAULT_MAX_KEYS: i32 = 1000;

/// Non-raising facade over an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
}

impl StorageClient {
    /// Wrap an object store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Provider name of the wrapped store.
    pub fn provider_type(&self) -> &str {
        self.store.provider_type()
    }

    /// Upload `local_path` under `key`. Returns `true` on success.
    pub async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> bool {
        if !local_path.is_file() {
            error!(path = %local_path.display(), "Upload source does not exist");
            return false;
        }

        let metadata = metadata.unwrap_or_default();
        match self.store.put_file(key, local_path, &metadata).await {
            Ok(()) => {
                info!(key, path = %local_path.display(), "Uploaded file");
                true
            }
            Err(e) => {
                error!(key, error = %e, "Upload failed");
                false
            }
        }
    }

    /// Download `key` into `local_path`. Returns `true` on success.
    pub async fn download(&self, key: &str, local_path: &Path) -> bool {
        match self.store.get_file(key, local_path).await {
            Ok(()) => {
                info!(key, path = %local_path.display(), "Downloaded file");
                true
            }
            Err(e) => {
                error!(key, error = %e, "Download failed");
                false
            }
        }
    }

    /// List objects under `prefix`. Empty on failure.
    pub async fn list(&self, prefix: &str, max_keys: i32) -> Vec<ObjectInfo> {
        match self.store.list(prefix, max_keys).await {
            Ok(objects) => objects,
            Err(e) => {
                error!(prefix, error = %e, "Listing failed");
                Vec::new()
            }
        }
    }

    /// Delete `key`. Returns `true` on success.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(()) => {
                debug!(key, "Deleted object");
                true
            }
            Err(e) => {
                error!(key, error = %e, "Delete failed");
                false
            }
        }
    }

    /// Whether `key` exists. Any failure other than not-found is logged.
    pub async fn exists(&self, key: &str) -> bool {
        match self.store.head(key).await {
            Ok(_) => true,
            Err(e) if e.is(ErrorKind::NotFound) => false,
            Err(e) => {
                warn!(key, error = %e, "Existence check failed");
                false
            }
        }
    }

    /// Object metadata, or `None` when missing or unreadable.
    pub async fn head(&self, key: &str) -> Option<ObjectMetadata> {
        match self.store.head(key).await {
            Ok(metadata) => Some(metadata),
            Err(e) if e.is(ErrorKind::NotFound) => None,
            Err(e) => {
                error!(key, error = %e, "Metadata lookup failed");
                None
            }
        }
    }

    /// Delete objects under `prefix` last modified more than
    /// `retention_days` ago. Returns the number deleted.
    ///
    /// Objects without a modification time are kept. A failed delete is
    /// logged and the remaining objects are still processed.
    pub async fn cleanup_older_than(&self, prefix: &str, retention_days: u32) -> usize {
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(retention_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut deleted = 0;

        for object in self.list(prefix, DEFAULT_MAX_KEYS).await {
            let Some(modified) = object.last_modified else {
                continue;
            };
            if modified < cutoff && self.delete(&object.key).await {
                info!(key = %object.key, %modified, "Deleted expired remote backup");
                deleted += 1;
            }
        }

        info!(prefix, deleted, retention_days, "Remote cleanup finished");
        deleted
    }

    /// Whether the store answers a one-key listing.
    pub async fn ping(&self) -> bool {
        match self.store.list("", 1).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Object store unreachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryObjectStore;
    use tempfile::TempDir;

    fn client() -> (Arc<MemoryObjectStore>, StorageClient) {
        let store = Arc::new(MemoryObjectStore::new());
        let client = StorageClient::new(store.clone());
        (store, client)
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let (_store, client) = client();
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("dump.sql");
        tokio::fs::write(&source, b"CREATE TABLE t;").await.unwrap();

        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "contentops".to_string());
        assert!(client.upload(&source, "backups/dump.sql", Some(metadata)).await);
        assert!(client.exists("backups/dump.sql").await);

        let head = client.head("backups/dump.sql").await.unwrap();
        assert_eq!(head.content_length, 15);
        assert_eq!(head.metadata.get("source").unwrap(), "contentops");

        let target = dir.path().join("restore/dump.sql");
        assert!(client.download("backups/dump.sql", &target).await);
        assert_eq!(
            tokio::fs::read(&target).await.unwrap(),
            b"CREATE TABLE t;".to_vec()
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file_returns_false() {
        let (store, client) = client();
        let dir = TempDir::new().unwrap();
        assert!(
            !client
                .upload(&dir.path().join("absent.sql"), "backups/absent.sql", None)
                .await
        );
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (_store, client) = client();
        let dir = TempDir::new().unwrap();
        assert!(!client.exists("nope").await);
        assert!(client.head("nope").await.is_none());
        assert!(!client.download("nope", &dir.path().join("x")).await);
    }

    #[tokio::test]
    async fn test_cleanup_older_than() {
        let (store, client) = client();
        let now = Utc::now();
        store.insert("backups/old.sql", "x", now - Duration::days(31));
        store.insert("backups/recent.sql", "x", now - Duration::days(29));
        store.insert("media/old.png", "x", now - Duration::days(90));

        let deleted = client.cleanup_older_than("backups/", 30).await;
        assert_eq!(deleted, 1);
        assert_eq!(store.keys(), vec!["backups/recent.sql", "media/old.png"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_raise() {
        let (store, client) = client();
        store.set_unavailable(true);
        assert!(!client.ping().await);
        assert!(client.list("", 10).await.is_empty());
        assert!(!client.delete("backups/a.sql").await);
        assert_eq!(client.cleanup_older_than("backups/", 30).await, 0);

        store.set_unavailable(false);
        assert!(client.ping().await);
    }

    #[tokio::test]
    async fn test_cleanup_with_huge_retention_keeps_everything() {
        let (store, client) = client();
        store.insert("backups/ancient.sql", "x", Utc::now() - Duration::days(3650));

        assert_eq!(client.cleanup_older_than("backups/", u32::MAX).await, 0);
        assert_eq!(store.keys(), vec!["backups/ancient.sql"]);
    }

    #[test]
    fn test_provider_type_comes_from_store() {
        let (_store, client) = client();
        assert_eq!(client.provider_type(), "memory");
    }
}
