//! Request planning for the CAMS solar radiation timeseries.
//!
//! One request covers the whole year; the dataset takes a single date range,
//! so the time-zone extension widens that range in place instead of adding a
//! second request.

use crate::calendar::{now_utc, DateRange};
use crate::era5point::LatLon;
use crate::types::request::{RequestSpec, SkyType, TimeReference, TimeStep};
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Plans the single radiation request for one year/location query.
///
/// Returns `None` when the year lies strictly in the future; the range end is
/// clamped to today for the current year. By default the range starts on
/// Dec 31 of the previous year, so local-time conversion has full coverage
/// for positive offsets. An explicit zero offset keeps the plain Jan 1 start,
/// and a negative offset instead pushes the end to Jan 1 of the next year
/// when the range ends on Dec 31.
#[allow(clippy::too_many_arguments)]
pub fn plan_radiation(
    location: LatLon,
    year: i32,
    sky_type: SkyType,
    altitude: Vec<String>,
    time_step: TimeStep,
    time_reference: TimeReference,
    time_zone: Option<i32>,
) -> Option<RequestSpec> {
    plan_radiation_at(
        location,
        year,
        sky_type,
        altitude,
        time_step,
        time_reference,
        time_zone,
        now_utc(),
    )
}

/// [`plan_radiation`] with an explicit `now`, the deterministic core.
#[allow(clippy::too_many_arguments)]
pub(crate) fn plan_radiation_at(
    location: LatLon,
    year: i32,
    sky_type: SkyType,
    altitude: Vec<String>,
    time_step: TimeStep,
    time_reference: TimeReference,
    time_zone: Option<i32>,
    now: DateTime<Utc>,
) -> Option<RequestSpec> {
    if year > now.year() {
        return None;
    }

    let year_start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let year_end = NaiveDate::from_ymd_opt(year, 12, 31)?;
    let mut start = year_start;
    let mut end = year_end.min(now.date_naive());

    match time_zone {
        // unset behaves like a positive offset
        None => {
            start = NaiveDate::from_ymd_opt(year - 1, 12, 31)?;
        }
        Some(tz) if tz > 0 && start == year_start => {
            start = NaiveDate::from_ymd_opt(year - 1, 12, 31)?;
        }
        Some(tz) if tz < 0 && end == year_end => {
            end = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
        }
        _ => {}
    }

    Some(RequestSpec::Radiation {
        range: DateRange::new(start, end),
        location,
        sky_type,
        altitude,
        time_step,
        time_reference,
    })
}
