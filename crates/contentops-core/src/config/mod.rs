//! Application configuration schemas.
//!
//! Configuration is assembled by the `config` crate from optional TOML files,
//! `CONTENTOPS__`-prefixed environment variables, and the flat variable names
//! used by the container deployment (`MYSQL_PASSWORD`, `R2_ENDPOINT`,
//! ...). Each sub-module represents a logical configuration section.

pub mod backup;
pub mod database;
pub mod logging;
pub mod scheduler;
pub mod sites;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::backup::{BackupConfig, SyncConfig};
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::scheduler::SchedulerConfig;
pub use self::sites::SitesConfig;
pub use self::storage::StorageConfig;

use crate::error::AppError;
use crate::result::AppResult;

/// Flat environment variable names mapped onto configuration keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("MYSQL_HOST", "database.host"),
    ("MYSQL_PORT", "database.port"),
    ("MYSQL_DATABASE", "database.name"),
    ("MYSQL_USER", "database.user"),
    ("MYSQL_PASSWORD", "database.password"),
    ("R2_ENDPOINT", "storage.endpoint"),
    ("R2_ACCESS_KEY_ID", "storage.access_key_id"),
    ("R2_SECRET_ACCESS_KEY", "storage.secret_access_key"),
    ("R2_BUCKET_NAME", "storage.bucket"),
    ("SITE1_DOMAIN", "sites.site1_domain"),
    ("SITE2_DOMAIN", "sites.site2_domain"),
    ("BACKUP_RETENTION_DAYS", "backup.retention_days"),
    ("BACKUP_DIR", "backup.directory"),
];

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Content database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Object storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// The two synchronized sites.
    #[serde(default)]
    pub sites: SitesConfig,
    /// Local backup artifacts and retention.
    #[serde(default)]
    pub backup: BackupConfig,
    /// Content synchronization windows.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Job cadences and polling.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the named environment from files and the
    /// process environment. A `.env` file is honoured when present.
    pub fn load(env: &str) -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::load_with(env, |key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` to resolve the flat legacy variables.
    ///
    /// Fails with a configuration error when any required secret is absent
    /// or a scheduler setting cannot be parsed.
    pub fn load_with<F>(env: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CONTENTOPS")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, lookup(var).filter(|v| !v.is_empty()))?;
        }

        let config: AppConfig = builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Check required secrets and parse scheduler settings.
    pub fn validate(&self) -> AppResult<()> {
        let mut missing = Vec::new();
        if self.database.password.is_empty() {
            missing.push("MYSQL_PASSWORD");
        }
        if self.storage.endpoint.is_empty() {
            missing.push("R2_ENDPOINT");
        }
        if self.storage.access_key_id.is_empty() {
            missing.push("R2_ACCESS_KEY_ID");
        }
        if self.storage.secret_access_key.is_empty() {
            missing.push("R2_SECRET_ACCESS_KEY");
        }
        if !missing.is_empty() {
            return Err(AppError::configuration(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )));
        }

        self.scheduler.backup_at()?;
        self.scheduler.cleanup_at()?;
        self.scheduler.cleanup_weekday()?;
        if self.scheduler.poll_interval_seconds == 0 {
            return Err(AppError::configuration(
                "scheduler.poll_interval_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MYSQL_PASSWORD", "secret"),
            ("R2_ENDPOINT", "https://account.r2.cloudflarestorage.com"),
            ("R2_ACCESS_KEY_ID", "key"),
            ("R2_SECRET_ACCESS_KEY", "shh"),
        ]
    }

    #[test]
    fn test_load_with_defaults() {
        let env = env_of(&required());
        let config = AppConfig::load_with("unit-test", |k| env.get(k).cloned()).unwrap();

        assert_eq!(config.database.host, "mysql");
        assert_eq!(config.database.name, "content_ops");
        assert_eq!(config.database.password, "secret");
        assert_eq!(config.storage.bucket, "content-ops-backups");
        assert_eq!(config.sites.site1_domain, "site1.localhost");
        assert_eq!(config.backup.retention_days, 30);
        assert_eq!(config.scheduler.poll_interval_seconds, 60);
    }

    #[test]
    fn test_legacy_overrides() {
        let mut pairs = required();
        pairs.push(("MYSQL_HOST", "db.internal"));
        pairs.push(("BACKUP_RETENTION_DAYS", "7"));
        pairs.push(("SITE2_DOMAIN", "news.example.com"));
        let env = env_of(&pairs);

        let config = AppConfig::load_with("unit-test", |k| env.get(k).cloned()).unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.backup.retention_days, 7);
        assert_eq!(config.sites.site2_url(), "http://news.example.com");
    }

    #[test]
    fn test_missing_secrets_are_fatal() {
        let env = env_of(&[("MYSQL_PASSWORD", "secret")]);
        let err = AppConfig::load_with("unit-test", |k| env.get(k).cloned()).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("R2_ENDPOINT"));
        assert!(err.message.contains("R2_ACCESS_KEY_ID"));
        assert!(err.message.contains("R2_SECRET_ACCESS_KEY"));
        assert!(!err.message.contains("MYSQL_PASSWORD"));
    }

    #[test]
    fn test_invalid_schedule_time_rejected() {
        let env = env_of(&required());
        let mut config = AppConfig::load_with("unit-test", |k| env.get(k).cloned()).unwrap();
        config.scheduler.backup_time = "25:99".to_string();

        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
