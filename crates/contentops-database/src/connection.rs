//! MySQL connection management.

use std::time::Duration;

use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use tracing::info;

use contentops_core::config::DatabaseConfig;
use contentops_core::error::{AppError, ErrorKind};
use contentops_core::result::AppResult;

/// Build connect options from configuration.
pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .charset("utf8mb4")
}

/// Open a pool holding a single connection.
///
/// Sync work runs sequentially, so one connection is reused for a whole
/// session and released by closing the pool.
pub async fn connect(config: &DatabaseConfig) -> AppResult<MySqlPool> {
    info!(
        dsn = %redacted_dsn(config),
        timeout_seconds = config.connect_timeout_seconds,
        "Connecting to MySQL"
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .connect_with(connect_options(config))
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to connect to database: {e}"),
                e,
            )
        })?;

    info!("Database connection established");
    Ok(pool)
}

/// Connection string with the password masked, for logging.
pub fn redacted_dsn(config: &DatabaseConfig) -> String {
    let credentials = if config.password.is_empty() {
        config.user.clone()
    } else {
        format!("{}:****", config.user)
    };
    format!(
        "mysql://{credentials}@{}:{}/{}",
        config.host, config.port, config.name
    )
}
