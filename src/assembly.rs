//! Reassembly of downloaded segments into one continuous series.
//!
//! Segments arrive one per (month, variable); segments of the same month are
//! stacked side by side on the variable axis, the resulting monthly tables
//! are stacked on the time axis, and the whole thing is sorted and
//! de-duplicated on the `"time"` column.

use chrono::{DateTime, Datelike};
use polars::prelude::*;
use thiserror::Error;

/// Name of the timestamp column every segment must carry.
pub const TIME_COLUMN: &str = "time";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Segment is missing the '{TIME_COLUMN}' column")]
    MissingTimeColumn(#[source] PolarsError),

    #[error("Segment '{TIME_COLUMN}' column is not a datetime, got {0}")]
    NotDatetime(DataType),

    #[error("Segment '{TIME_COLUMN}' column starts with a null timestamp")]
    NullTimestamp,

    #[error("Failed to combine segments")]
    Combine(#[source] PolarsError),
}

/// Merges loaded segments into one series: ascending unique timestamps, one
/// column per variable.
///
/// Segments are grouped by the (year, month) of their first timestamp; within
/// a group, exactly one segment per variable is assumed (two segments
/// carrying the same variable for the same month are not validated and
/// surface as a duplicate-column error). Empty segments are skipped silently;
/// an empty input produces an empty frame.
pub fn merge_segments(segments: Vec<DataFrame>) -> Result<DataFrame, MergeError> {
    let mut groups: Vec<((i32, u32), Vec<DataFrame>)> = Vec::new();
    for segment in segments {
        if segment.height() == 0 {
            continue;
        }
        let key = first_month(&segment)?;
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(segment),
            None => groups.push((key, vec![segment])),
        }
    }

    // variable axis: widen each monthly group to one table
    let mut monthly: Vec<DataFrame> = Vec::new();
    for (_, members) in groups {
        let mut members = members.into_iter();
        let mut base = match members.next() {
            Some(first) => first,
            None => continue,
        };
        for segment in members {
            let extra = segment.drop(TIME_COLUMN).map_err(MergeError::Combine)?;
            base = base.hstack(extra.get_columns()).map_err(MergeError::Combine)?;
        }
        monthly.push(base);
    }

    // time axis
    let mut monthly = monthly.into_iter();
    let mut combined = match monthly.next() {
        Some(first) => first,
        None => return Ok(DataFrame::empty()),
    };
    for frame in monthly {
        combined = combined.vstack(&frame).map_err(MergeError::Combine)?;
    }

    // a stable sort keeps colliding timestamps in stacking order, so the
    // keep-first dedup below is deterministic
    let sorted = combined
        .sort(
            [TIME_COLUMN],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .map_err(MergeError::Combine)?;
    sorted
        .unique_stable(
            Some(&[TIME_COLUMN.to_string()]),
            UniqueKeepStrategy::First,
            None,
        )
        .map_err(MergeError::Combine)
}

/// The (year, month) of a segment's first timestamp.
fn first_month(segment: &DataFrame) -> Result<(i32, u32), MergeError> {
    let time = segment
        .column(TIME_COLUMN)
        .map_err(MergeError::MissingTimeColumn)?;
    let value = time.get(0).map_err(MergeError::Combine)?;
    let (raw, unit) = match value {
        AnyValue::Datetime(raw, unit, _) => (raw, unit),
        AnyValue::DatetimeOwned(raw, unit, _) => (raw, unit),
        AnyValue::Null => return Err(MergeError::NullTimestamp),
        _ => return Err(MergeError::NotDatetime(time.dtype().clone())),
    };
    let millis = match unit {
        TimeUnit::Milliseconds => raw,
        TimeUnit::Microseconds => raw / 1_000,
        TimeUnit::Nanoseconds => raw / 1_000_000,
    };
    let timestamp = DateTime::from_timestamp_millis(millis)
        .ok_or(MergeError::NullTimestamp)?
        .naive_utc();
    Ok((timestamp.year(), timestamp.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn hourly_times(year: i32, month: u32, day: u32, hours: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..hours as i64)
            .map(|h| start + Duration::hours(h))
            .collect()
    }

    fn segment(name: &str, times: Vec<NaiveDateTime>) -> DataFrame {
        let values: Vec<f64> = (0..times.len()).map(|i| i as f64).collect();
        df!(TIME_COLUMN => times, name => values).unwrap()
    }

    fn time_values(frame: &DataFrame) -> Vec<i64> {
        frame
            .column(TIME_COLUMN)
            .unwrap()
            .datetime()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_two_months_two_variables() {
        let segments = vec![
            segment("t2m", hourly_times(2021, 1, 1, 48)),
            segment("tp", hourly_times(2021, 1, 1, 48)),
            segment("t2m", hourly_times(2021, 2, 1, 24)),
            segment("tp", hourly_times(2021, 2, 1, 24)),
        ];
        let merged = merge_segments(segments).unwrap();

        assert_eq!(merged.height(), 72);
        assert_eq!(merged.width(), 3);
        let names = merged.get_column_names();
        assert!(names.iter().any(|n| n.as_str() == "t2m"));
        assert!(names.iter().any(|n| n.as_str() == "tp"));

        let times = time_values(&merged);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_groups_sorted_regardless_of_input_order() {
        // February arrives before January
        let segments = vec![
            segment("t2m", hourly_times(2021, 2, 1, 24)),
            segment("t2m", hourly_times(2021, 1, 1, 24)),
        ];
        let merged = merge_segments(segments).unwrap();
        let times = time_values(&merged);
        assert_eq!(times.len(), 48);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        let jan_first = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(times[0], jan_first);
    }

    #[test]
    fn test_duplicate_timestamps_dropped_keeping_first() {
        // 25 hours starting Jan 31 spill into Feb 1 00:00, which the
        // February segment also carries
        let overlap = vec![
            segment("t2m", hourly_times(2021, 1, 31, 25)),
            segment("t2m", hourly_times(2021, 2, 1, 24)),
        ];
        let merged = merge_segments(overlap).unwrap();
        assert_eq!(merged.height(), 25 + 24 - 1);
        let times = time_values(&merged);
        assert!(times.windows(2).all(|w| w[0] < w[1]));

        // the January segment's row wins at the collision timestamp: its
        // Feb 1 00:00 value is 24.0, the February segment's is 0.0
        let feb_first = NaiveDate::from_ymd_opt(2021, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        let index = times.iter().position(|t| *t == feb_first).unwrap();
        let survivor = merged.column("t2m").unwrap().f64().unwrap().get(index);
        assert_eq!(survivor, Some(24.0));
    }

    #[test]
    fn test_idempotent_on_clean_input() {
        let merged = merge_segments(vec![
            segment("t2m", hourly_times(2021, 1, 1, 48)),
            segment("t2m", hourly_times(2021, 2, 1, 24)),
        ])
        .unwrap();
        let again = merge_segments(vec![merged.clone()]).unwrap();
        assert!(merged.equals(&again));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let empty = segment("t2m", Vec::new());
        let merged = merge_segments(vec![empty, segment("t2m", hourly_times(2021, 1, 1, 24))])
            .unwrap();
        assert_eq!(merged.height(), 24);
    }

    #[test]
    fn test_no_segments_yields_empty_frame() {
        let merged = merge_segments(Vec::new()).unwrap();
        assert_eq!(merged.height(), 0);
    }

    #[test]
    fn test_missing_time_column_is_an_error() {
        let bad = df!("t2m" => [1.0f64, 2.0]).unwrap();
        assert!(matches!(
            merge_segments(vec![bad]),
            Err(MergeError::MissingTimeColumn(_))
        ));
    }
}
