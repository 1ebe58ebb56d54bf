//! Recurrence rules for scheduled jobs.

use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, NaiveTime, Utc, Weekday};
use serde::Serialize;

use contentops_core::error::AppError;
use contentops_core::result::AppResult;

/// When a job recurs. All times are UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cadence {
    /// Every day at a fixed time.
    Daily {
        /// Time of day.
        at: NaiveTime,
    },
    /// Every `n` hours.
    EveryHours(u32),
    /// Every week on a fixed day and time.
    Weekly {
        /// Day of the week.
        day: Weekday,
        /// Time of day.
        at: NaiveTime,
    },
    /// Every `n` minutes.
    EveryMinutes(u32),
}

/// Longest accepted interval: one hundred years of hours.
pub const MAX_INTERVAL_HOURS: u32 = 24 * 366 * 100;

impl Cadence {
    /// Reject intervals of zero, which would never advance, and intervals
    /// longer than [`MAX_INTERVAL_HOURS`], which leave the representable
    /// date range.
    pub fn validate(&self) -> AppResult<()> {
        let hours = match *self {
            Self::EveryHours(0) | Self::EveryMinutes(0) => {
                return Err(AppError::configuration(format!(
                    "Cadence '{self}' has a zero interval"
                )));
            }
            Self::EveryHours(hours) => hours,
            Self::EveryMinutes(minutes) => minutes / 60,
            Self::Daily { .. } | Self::Weekly { .. } => return Ok(()),
        };
        if hours > MAX_INTERVAL_HOURS {
            return Err(AppError::configuration(format!(
                "Cadence '{self}' exceeds the maximum interval of {MAX_INTERVAL_HOURS} hours"
            )));
        }
        Ok(())
    }

    /// The first trigger time strictly after `reference`.
    ///
    /// Saturates at the latest representable time instead of overflowing.
    pub fn next_after(&self, reference: DateTime<Utc>) -> DateTime<Utc> {
        let next = match *self {
            Self::EveryHours(hours) => {
                reference.checked_add_signed(Duration::hours(i64::from(hours)))
            }
            Self::EveryMinutes(minutes) => {
                reference.checked_add_signed(Duration::minutes(i64::from(minutes)))
            }
            Self::Daily { at } => {
                let candidate = reference.date_naive().and_time(at).and_utc();
                if candidate > reference {
                    Some(candidate)
                } else {
                    candidate.checked_add_signed(Duration::days(1))
                }
            }
            Self::Weekly { day, at } => {
                let days_ahead = (i64::from(day.num_days_from_monday())
                    - i64::from(reference.weekday().num_days_from_monday()))
                .rem_euclid(7);
                reference
                    .date_naive()
                    .checked_add_days(Days::new(days_ahead.unsigned_abs()))
                    .map(|date| date.and_time(at).and_utc())
                    .and_then(|candidate| {
                        if candidate > reference {
                            Some(candidate)
                        } else {
                            candidate.checked_add_signed(Duration::days(7))
                        }
                    })
            }
        };
        next.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Self::EveryHours(1) => write!(f, "every hour"),
            Self::EveryHours(n) => write!(f, "every {n} hours"),
            Self::Weekly { day, at } => write!(f, "every {day} at {}", at.format("%H:%M")),
            Self::EveryMinutes(1) => write!(f, "every minute"),
            Self::EveryMinutes(n) => write!(f, "every {n} minutes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_daily_before_and_after_time() {
        let cadence = Cadence::Daily { at: at(2, 0) };
        let morning = Utc.with_ymd_and_hms(2024, 3, 10, 1, 30, 0).unwrap();
        assert_eq!(
            cadence.next_after(morning),
            Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap()
        );

        let exactly = Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap();
        assert_eq!(
            cadence.next_after(exactly),
            Utc.with_ymd_and_hms(2024, 3, 11, 2, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly() {
        let cadence = Cadence::Weekly {
            day: Weekday::Sun,
            at: at(3, 0),
        };
        // 2024-03-13 is a Wednesday.
        let wednesday = Utc.with_ymd_and_hms(2024, 3, 13, 12, 0, 0).unwrap();
        assert_eq!(
            cadence.next_after(wednesday),
            Utc.with_ymd_and_hms(2024, 3, 17, 3, 0, 0).unwrap()
        );

        let sunday_late = Utc.with_ymd_and_hms(2024, 3, 17, 4, 0, 0).unwrap();
        assert_eq!(
            cadence.next_after(sunday_late),
            Utc.with_ymd_and_hms(2024, 3, 24, 3, 0, 0).unwrap()
        );

        let sunday_early = Utc.with_ymd_and_hms(2024, 3, 17, 1, 0, 0).unwrap();
        assert_eq!(
            cadence.next_after(sunday_early),
            Utc.with_ymd_and_hms(2024, 3, 17, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_intervals() {
        let t = Utc.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(
            Cadence::EveryHours(6).next_after(t),
            Utc.with_ymd_and_hms(2025, 1, 1, 5, 30, 0).unwrap()
        );
        assert_eq!(
            Cadence::EveryMinutes(45).next_after(t),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cadence::EveryHours(0).validate().is_err());
        assert!(Cadence::EveryMinutes(0).validate().is_err());
        assert!(Cadence::EveryMinutes(1).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_interval_rejected() {
        let err = Cadence::EveryHours(u32::MAX).validate().unwrap_err();
        assert_eq!(err.kind, contentops_core::ErrorKind::Configuration);
        assert!(Cadence::EveryHours(MAX_INTERVAL_HOURS).validate().is_ok());
        assert!(Cadence::EveryHours(MAX_INTERVAL_HOURS + 1).validate().is_err());
        assert!(Cadence::EveryMinutes(u32::MAX).validate().is_err());
    }

    #[test]
    fn test_next_after_saturates_near_the_end_of_time() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        assert_eq!(
            Cadence::EveryHours(u32::MAX).next_after(late),
            DateTime::<Utc>::MAX_UTC
        );
        assert_eq!(
            Cadence::Weekly {
                day: Weekday::Mon,
                at: at(0, 0)
            }
            .next_after(late),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Cadence::Daily { at: at(2, 0) }.to_string(), "daily at 02:00");
        assert_eq!(Cadence::EveryHours(6).to_string(), "every 6 hours");
        assert_eq!(
            Cadence::Weekly {
                day: Weekday::Sun,
                at: at(3, 0)
            }
            .to_string(),
            "every Sun at 03:00"
        );
    }
}
