//! `mysqldump` backup producer.
//!
//! Runs the dump tool as a child process with stdout redirected into the
//! target file. The password is passed through `MYSQL_PWD` so it never
//! shows up in the process list.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use contentops_core::config::DatabaseConfig;
use contentops_core::error::{AppError, ErrorKind};
use contentops_core::result::AppResult;
use contentops_core::traits::backup::BackupProducer;

/// Produces logical dumps with `mysqldump` (or a compatible tool).
#[derive(Debug, Clone)]
pub struct MysqldumpProducer {
    command: PathBuf,
    host: String,
    port: u16,
    user: String,
    password: String,
    database: String,
}

impl MysqldumpProducer {
    /// Create a producer invoking `command` against the configured database.
    pub fn new(command: impl Into<PathBuf>, config: &DatabaseConfig) -> Self {
        Self {
            command: command.into(),
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.name.clone(),
        }
    }

    /// Command-line arguments for a dump of `tables` (all when empty).
    pub fn args(&self, tables: &[String]) -> Vec<String> {
        let mut args = vec![
            "-h".to_string(),
            self.host.clone(),
            "-P".to_string(),
            self.port.to_string(),
            "-u".to_string(),
            self.user.clone(),
            "--single-transaction".to_string(),
            "--routines".to_string(),
            "--triggers".to_string(),
            self.database.clone(),
        ];
        args.extend(tables.iter().cloned());
        args
    }
}

#[async_trait]
impl BackupProducer for MysqldumpProducer {
    async fn dump(&self, target: &Path, tables: &[String]) -> AppResult<()> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = std::fs::File::create(target).map_err(|e| {
            AppError::with_source(
                ErrorKind::Backup,
                format!("Cannot create '{}'", target.display()),
                e,
            )
        })?;

        info!(
            command = %self.command.display(),
            database = %self.database,
            tables = tables.len(),
            target = %target.display(),
            "Running database dump"
        );

        let output = Command::new(&self.command)
            .args(self.args(tables))
            .env("MYSQL_PWD", &self.password)
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let failure = match output {
            Ok(output) if output.status.success() => {
                debug!(target = %target.display(), "Dump finished");
                return Ok(());
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let code = output.status.code().unwrap_or(-1);
                error!(
                    code,
                    stderr = %stderr.chars().take(500).collect::<String>(),
                    "Database dump failed"
                );
                AppError::backup(format!(
                    "Dump exited with code {code}: {}",
                    stderr.chars().take(2000).collect::<String>().trim()
                ))
            }
            Err(e) => AppError::with_source(
                ErrorKind::Backup,
                format!("Failed to run '{}': {e}", self.command.display()),
                e,
            ),
        };

        if let Err(e) = tokio::fs::remove_file(target).await {
            debug!(error = %e, target = %target.display(), "Could not remove partial dump");
        }
        Err(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn producer(command: &str) -> MysqldumpProducer {
        let config = DatabaseConfig {
            password: "secret".to_string(),
            ..DatabaseConfig::default()
        };
        MysqldumpProducer::new(command, &config)
    }

    #[test]
    fn test_args_exclude_password() {
        let args = producer("mysqldump").args(&["site1_posts".to_string()]);
        assert_eq!(
            args,
            vec![
                "-h",
                "mysql",
                "-P",
                "3306",
                "-u",
                "content_user",
                "--single-transaction",
                "--routines",
                "--triggers",
                "content_ops",
                "site1_posts",
            ]
        );
        assert!(!args.iter().any(|a| a.contains("secret")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_command_writes_stdout() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("dump.sql");
        producer("echo").dump(&target, &[]).await.unwrap();
        let written = tokio::fs::read_to_string(&target).await.unwrap();
        assert!(written.contains("--single-transaction"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_command_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("dump.sql");
        let err = producer("false").dump(&target, &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Backup);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_missing_command_is_backup_error() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("dump.sql");
        let err = producer("/nonexistent/mysqldump")
            .dump(&target, &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Backup);
        assert!(!target.exists());
    }
}
