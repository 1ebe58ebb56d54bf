//! Site configuration for cross-site synchronization.

use serde::{Deserialize, Serialize};

/// The two WordPress-style sites sharing one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    /// Public domain of the first site.
    #[serde(default = "default_site1_domain")]
    pub site1_domain: String,
    /// Public domain of the second site.
    #[serde(default = "default_site2_domain")]
    pub site2_domain: String,
    /// Table prefix of the first site.
    #[serde(default = "default_site1_prefix")]
    pub site1_prefix: String,
    /// Table prefix of the second site.
    #[serde(default = "default_site2_prefix")]
    pub site2_prefix: String,
}

impl SitesConfig {
    /// Absolute URL of the first site.
    pub fn site1_url(&self) -> String {
        format!("http://{}", self.site1_domain)
    }

    /// Absolute URL of the second site.
    pub fn site2_url(&self) -> String {
        format!("http://{}", self.site2_domain)
    }
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            site1_domain: default_site1_domain(),
            site2_domain: default_site2_domain(),
            site1_prefix: default_site1_prefix(),
            site2_prefix: default_site2_prefix(),
        }
    }
}

fn default_site1_domain() -> String {
    "site1.localhost".to_string()
}

fn default_site2_domain() -> String {
    "site2.localhost".to_string()
}

fn default_site1_prefix() -> String {
    "site1_".to_string()
}

fn default_site2_prefix() -> String {
    "site2_".to_string()
}
