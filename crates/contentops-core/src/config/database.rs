//! Database configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content database (MySQL) connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host name.
    #[serde(default = "default_host")]
    pub host: String,
    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database (schema) name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Database user.
    #[serde(default = "default_user")]
    pub user: String,
    /// Database password. Required.
    #[serde(default)]
    pub password: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            name: default_name(),
            user: default_user(),
            password: String::new(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"****")
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

fn default_host() -> String {
    "mysql".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_name() -> String {
    "content_ops".to_string()
}

fn default_user() -> String {
    "content_user".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}
