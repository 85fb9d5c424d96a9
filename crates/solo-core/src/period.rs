//! # Reporting Periods
//!
//! Inclusive date ranges used to scope KPIs and history listings.
//!
//! All boundaries are UTC. Business dates are stored at noon UTC, so a
//! day-aligned range always captures every record of its days.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// Inclusive `[start, end]` timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<Self> {
        if end < start {
            return Err(ValidationError::format(
                "date range",
                "end is before start",
            ));
        }
        Ok(DateRange { start, end })
    }

    /// From the first instant of `first` to the last instant of `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> ValidationResult<Self> {
        let start = Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN));
        let end = Utc.from_utc_datetime(&last.and_time(NaiveTime::MIN)) + Duration::days(1)
            - Duration::nanoseconds(1);
        DateRange::new(start, end)
    }

    /// A single calendar day.
    pub fn day(date: NaiveDate) -> Self {
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        DateRange {
            start,
            end: start + Duration::days(1) - Duration::nanoseconds(1),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Presets offered by the KPI filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "period")]
pub enum Period {
    AllTime,
    Today,
    Yesterday,
    /// Monday of the current week through today.
    ThisWeek,
    /// First of the current month through today.
    ThisMonth,
    Custom { first: NaiveDate, last: NaiveDate },
}

impl Period {
    /// Resolves the preset relative to `today`. `None` means all time.
    pub fn resolve(&self, today: NaiveDate) -> ValidationResult<Option<DateRange>> {
        let range = match *self {
            Period::AllTime => return Ok(None),
            Period::Today => DateRange::day(today),
            Period::Yesterday => {
                let yesterday = today - Days::new(1);
                DateRange::day(yesterday)
            }
            Period::ThisWeek => {
                let back = today.weekday().num_days_from_monday() as u64;
                DateRange::days(today - Days::new(back), today)?
            }
            Period::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                DateRange::days(first, today)?
            }
            Period::Custom { first, last } => DateRange::days(first, last)?,
        };
        Ok(Some(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_range_is_inclusive() {
        let range = DateRange::day(date(2024, 3, 10));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_week_starts_monday() {
        // 2024-03-14 is a Thursday
        let range = Period::ThisWeek.resolve(date(2024, 3, 14)).unwrap().unwrap();
        assert_eq!(range.start().date_naive(), date(2024, 3, 11));
        assert_eq!(range.end().date_naive(), date(2024, 3, 14));

        // Sunday belongs to the week that started six days earlier
        let range = Period::ThisWeek.resolve(date(2024, 3, 17)).unwrap().unwrap();
        assert_eq!(range.start().date_naive(), date(2024, 3, 11));
    }

    #[test]
    fn test_month_and_yesterday() {
        let month = Period::ThisMonth.resolve(date(2024, 3, 14)).unwrap().unwrap();
        assert_eq!(month.start().date_naive(), date(2024, 3, 1));

        let yesterday = Period::Yesterday.resolve(date(2024, 3, 1)).unwrap().unwrap();
        assert_eq!(yesterday.start().date_naive(), date(2024, 2, 29));
        assert_eq!(Period::AllTime.resolve(date(2024, 3, 1)).unwrap(), None);
    }

    #[test]
    fn test_reversed_custom_range_rejected() {
        let period = Period::Custom {
            first: date(2024, 3, 10),
            last: date(2024, 3, 1),
        };
        assert!(period.resolve(date(2024, 3, 14)).is_err());
    }
}
