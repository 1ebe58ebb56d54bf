//! Object storage trait for S3-compatible backends.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modified timestamp.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag.
    pub etag: Option<String>,
}

/// Metadata returned by a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectMetadata {
    /// Size in bytes.
    pub content_length: u64,
    /// MIME type (if known).
    pub content_type: Option<String>,
    /// Last modified timestamp.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag.
    pub etag: Option<String>,
    /// User-defined metadata.
    pub metadata: HashMap<String, String>,
}

/// Key/value blob API of the object storage service.
///
/// Implementations return `ErrorKind::NotFound` from [`ObjectStore::head`]
/// and [`ObjectStore::get_file`] when the key does not exist, and
/// `ErrorKind::Storage` for every other failure.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "s3", "memory").
    fn provider_type(&self) -> &str;

    /// Upload the file at `path` under `key`.
    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> AppResult<()>;

    /// Download `key` into the file at `path`, replacing it.
    async fn get_file(&self, key: &str, path: &Path) -> AppResult<()>;

    /// List up to `max_keys` objects whose key starts with `prefix`.
    async fn list(&self, prefix: &str, max_keys: i32) -> AppResult<Vec<ObjectInfo>>;

    /// Fetch object metadata without the body.
    async fn head(&self, key: &str) -> AppResult<ObjectMetadata>;

    /// Delete `key`.
    async fn delete(&self, key: &str) -> AppResult<()>;
}
