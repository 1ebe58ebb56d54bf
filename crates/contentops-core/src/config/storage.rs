//! Object storage configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// S3-compatible object storage settings (Cloudflare R2 in production).
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL. Required.
    #[serde(default)]
    pub endpoint: String,
    /// Signing region. R2 accepts `auto`.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket holding backup artifacts.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Access key ID. Required.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key. Required.
    #[serde(default)]
    pub secret_access_key: String,
    /// Use path-style addressing (`endpoint/bucket/key`).
    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            bucket: default_bucket(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            force_path_style: true,
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"****")
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_bucket() -> String {
    "content-ops-backups".to_string()
}

fn default_true() -> bool {
    true
}
