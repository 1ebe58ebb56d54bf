//! Scheduler configuration.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// Job cadences and polling granularity. Times are UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds slept between polls of the job registry.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Daily backup time, `HH:MM`.
    #[serde(default = "default_backup_time")]
    pub backup_time: String,
    /// Hours between content synchronizations.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_hours: u32,
    /// Weekday of the retention cleanup.
    #[serde(default = "default_cleanup_day")]
    pub cleanup_day: String,
    /// Time of the weekly retention cleanup, `HH:MM`.
    #[serde(default = "default_cleanup_time")]
    pub cleanup_time: String,
    /// Minutes between health checks.
    #[serde(default = "default_health_interval")]
    pub health_interval_minutes: u32,
}

impl SchedulerConfig {
    /// Parsed daily backup time.
    pub fn backup_at(&self) -> AppResult<NaiveTime> {
        parse_time("scheduler.backup_time", &self.backup_time)
    }

    /// Parsed weekly cleanup time.
    pub fn cleanup_at(&self) -> AppResult<NaiveTime> {
        parse_time("scheduler.cleanup_time", &self.cleanup_time)
    }

    /// Parsed weekly cleanup day.
    pub fn cleanup_weekday(&self) -> AppResult<Weekday> {
        self.cleanup_day.trim().parse::<Weekday>().map_err(|_| {
            AppError::configuration(format!(
                "scheduler.cleanup_day: '{}' is not a weekday",
                self.cleanup_day
            ))
        })
    }
}

fn parse_time(key: &str, value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        AppError::configuration(format!("{key}: '{value}' is not a HH:MM time ({e})"))
    })
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            backup_time: default_backup_time(),
            sync_interval_hours: default_sync_interval(),
            cleanup_day: default_cleanup_day(),
            cleanup_time: default_cleanup_time(),
            health_interval_minutes: default_health_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}

fn default_backup_time() -> String {
    "02:00".to_string()
}

fn default_sync_interval() -> u32 {
    6
}

fn default_cleanup_day() -> String {
    "sunday".to_string()
}

fn default_cleanup_time() -> String {
    "03:00".to_string()
}

fn default_health_interval() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        let config = SchedulerConfig::default();
        assert_eq!(
            config.backup_at().unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap()
        );
        assert_eq!(config.cleanup_weekday().unwrap(), Weekday::Sun);
    }

    #[test]
    fn test_bad_weekday() {
        let config = SchedulerConfig {
            cleanup_day: "someday".to_string(),
            ..SchedulerConfig::default()
        };
        assert!(config.cleanup_weekday().is_err());
    }
}
