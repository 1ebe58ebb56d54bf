//! S3-compatible object store (Cloudflare R2, MinIO, AWS).

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTime as S3DateTime};
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use contentops_core::config::StorageConfig;
use contentops_core::error::AppError;
use contentops_core::result::AppResult;
use contentops_core::traits::storage::{ObjectInfo, ObjectMetadata, ObjectStore};

/// S3-compatible object store bound to one bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from configuration and verify the bucket is reachable.
    ///
    /// Bad credentials or an unreachable bucket are configuration errors:
    /// the process is expected to stop rather than run without storage.
    pub async fn connect(config: &StorageConfig) -> AppResult<Self> {
        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 object store"
        );

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "contentops-config",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(config.endpoint.clone())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();
        let client = Client::from_conf(s3_config);

        client
            .head_bucket()
            .bucket(&config.bucket)
            .send()
            .await
            .map_err(|e| {
                AppError::configuration(format!(
                    "Cannot access bucket '{}': {}",
                    config.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!(bucket = %config.bucket, "S3 object store initialized");
        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> AppResult<()> {
        let body = ByteStream::from_path(path).await.map_err(|e| {
            AppError::storage(format!("Failed to open '{}': {e}", path.display()))
        })?;

        let metadata = (!metadata.is_empty()).then(|| metadata.clone());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .set_metadata(metadata)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "Failed to upload '{key}': {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(key, bucket = %self.bucket, "Uploaded object");
        Ok(())
    }

    async fn get_file(&self, key: &str, path: &Path) -> AppResult<()> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    AppError::storage(format!(
                        "Failed to download '{key}': {}",
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut body = output.body;
        let mut written = 0usize;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| AppError::storage(format!("Failed to read body of '{key}': {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(key, bytes = written, path = %path.display(), "Downloaded object");
        Ok(())
    }

    async fn list(&self, prefix: &str, max_keys: i32) -> AppResult<Vec<ObjectInfo>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "Failed to list '{prefix}': {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(output
            .contents()
            .iter()
            .map(|obj| ObjectInfo {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0).max(0) as u64,
                last_modified: obj.last_modified().and_then(to_chrono),
                etag: obj.e_tag().map(str::to_string),
            })
            .collect())
    }

    async fn head(&self, key: &str) -> AppResult<ObjectMetadata> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    AppError::storage(format!(
                        "Failed to read metadata of '{key}': {}",
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        Ok(ObjectMetadata {
            content_length: output.content_length().unwrap_or(0).max(0) as u64,
            content_type: output.content_type().map(str::to_string),
            last_modified: output.last_modified().and_then(to_chrono),
            etag: output.e_tag().map(str::to_string),
            metadata: output.metadata().cloned().unwrap_or_default(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "Failed to delete '{key}': {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

fn to_chrono(dt: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
