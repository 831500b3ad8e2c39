//! Calendar helpers shared by the request planners: leap-aware month lengths,
//! day lists clamped to the archive's "data available up to now" horizon, and
//! the `start/end` date-range strings the Copernicus APIs expect.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::fmt;

/// Current UTC instant. All temporal clamping in the planners is relative to
/// this; the planners take it as an explicit parameter so tests can pin it.
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_month_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_day_of_next_month = NaiveDate::from_ymd_opt(next_month_year, next_month, 1)?;
    let last_day_of_current_month = first_day_of_next_month - Duration::days(1);
    Some(last_day_of_current_month.day())
}

/// Zero-padded day-of-month list for a gridded request.
///
/// Covers the full month for past months, only `1..=now.day` for the current
/// month (the archive has nothing beyond that), and is empty for months that
/// lie wholly in the future.
pub(crate) fn request_days(year: i32, month: u32, now: DateTime<Utc>) -> Vec<String> {
    if year > now.year() || (year == now.year() && month > now.month()) {
        return Vec::new();
    }
    let last = if year == now.year() && month == now.month() {
        now.day()
    } else {
        match days_in_month(year, month) {
            Some(d) => d,
            None => return Vec::new(),
        }
    };
    (1..=last).map(|d| format!("{d:02}")).collect()
}

/// An inclusive calendar date range, rendered as `"{start}/{end}"` on the
/// wire (the selector format of the timeseries and radiation datasets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Single-day range, used for the time-zone boundary extensions.
    pub(crate) fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// The `(year, month)` pairs this range touches, inclusive of both
    /// endpoints, in chronological order.
    pub(crate) fn months(&self) -> Vec<(i32, u32)> {
        let mut months = Vec::new();
        let (mut year, mut month) = (self.start.year(), self.start.month());
        let last = (self.end.year(), self.end.month());
        while (year, month) <= last {
            months.push((year, month));
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        months
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}
