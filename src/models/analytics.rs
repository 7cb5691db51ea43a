//! Analytics snapshot model

use chrono::{Days, NaiveDate};

/// Length of the trailing window, both ends included
pub const TRAILING_WINDOW_DAYS: u64 = 30;

/// Inclusive date range of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Just `as_of`
    pub fn single_day(as_of: NaiveDate) -> Self {
        Self {
            start: as_of,
            end: as_of,
        }
    }

    /// The `days` calendar days ending on `as_of`
    pub fn trailing(as_of: NaiveDate, days: u64) -> Self {
        let start = as_of
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: as_of }
    }

    /// From `floor` up to `as_of`
    pub fn since(floor: NaiveDate, as_of: NaiveDate) -> Self {
        Self {
            start: floor.min(as_of),
            end: as_of,
        }
    }
}

/// Users and views reported for one range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricCounts {
    pub users: u64,
    pub views: u64,
}

/// Counts for the three reporting windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsSnapshot {
    pub today: MetricCounts,
    pub last_30_days: MetricCounts,
    pub all_time: MetricCounts,
}
