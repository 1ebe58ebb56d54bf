//! Tracing subscriber setup for the CLI.

use tracing_subscriber::{EnvFilter, fmt};

use contentops_core::config::LoggingConfig;

const CRATES: [&str; 5] = [
    "contentops_cli",
    "contentops_worker",
    "contentops_storage",
    "contentops_database",
    "contentops_core",
];

/// Filter used when `RUST_LOG` is unset: our crates at `level`, the rest at warn.
pub fn default_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for krate in CRATES {
        directives.push_str(&format!(",{krate}={level}"));
    }
    directives
}

/// Install the global subscriber. JSON when `logging.format = "json"`.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let result = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(false).try_init(),
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
