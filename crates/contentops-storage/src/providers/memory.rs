//! In-process object store.
//!
//! Keeps objects in a sorted map so listings come back in key order like
//! S3. Used by tests and for dry runs without a bucket.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use contentops_core::error::AppError;
use contentops_core::result::AppResult;
use contentops_core::traits::storage::{ObjectInfo, ObjectMetadata, ObjectStore};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    metadata: HashMap<String, String>,
    last_modified: DateTime<Utc>,
}

/// Object store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    unavailable: AtomicBool,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly with an explicit modification time.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    metadata: HashMap::new(),
                    last_modified,
                },
            );
    }

    /// Make every subsequent call fail with a storage error (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All keys currently stored, in order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::storage("Object store unavailable"));
        }
        Ok(())
    }

    fn get(&self, key: &str) -> AppResult<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> AppResult<()> {
        self.check_available()?;
        let data = tokio::fs::read(path).await.map_err(|e| {
            AppError::with_source(
                contentops_core::ErrorKind::Storage,
                format!("Failed to read '{}'", path.display()),
                e,
            )
        })?;

        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                StoredObject {
                    data: Bytes::from(data),
                    metadata: metadata.clone(),
                    last_modified: Utc::now(),
                },
            );
        Ok(())
    }

    async fn get_file(&self, key: &str, path: &Path) -> AppResult<()> {
        self.check_available()?;
        let object = self.get(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &object.data).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str, max_keys: i32) -> AppResult<Vec<ObjectInfo>> {
        self.check_available()?;
        let limit = usize::try_from(max_keys).unwrap_or(0);
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
                etag: None,
            })
            .collect())
    }

    async fn head(&self, key: &str) -> AppResult<ObjectMetadata> {
        self.check_available()?;
        let object = self.get(key)?;
        Ok(ObjectMetadata {
            content_length: object.data.len() as u64,
            content_type: None,
            last_modified: Some(object.last_modified),
            etag: None,
            metadata: object.metadata,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check_available()?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
