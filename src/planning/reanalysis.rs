//! Request planning for the ERA5 reanalysis datasets.
//!
//! Splits a variables/year/location query into dataset-specific request
//! specifications, clamping everything to the data the archive can actually
//! serve (nothing beyond the current UTC instant) and extending the covered
//! range by one day where a local-time offset crosses a year boundary.

use crate::calendar::{days_in_month, now_utc, request_days, DateRange};
use crate::era5point::LatLon;
use crate::planning::error::PlanError;
use crate::types::dataset::{Dataset, REANALYSIS_PRIORITY};
use crate::types::request::RequestSpec;
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Plans the reanalysis requests for one variables/year/location query.
///
/// With `dataset` unset, the dataset is selected dynamically from the
/// capability table; this requires exactly one variable, because different
/// variables may resolve to different datasets. With `month` unset the whole
/// year is covered, clamped to the current month for the current year.
///
/// A period that lies entirely in the future is not an error: the result is
/// simply empty. Usage mistakes (missing month for the gridded dataset,
/// ambiguous dynamic selection, the radiation dataset passed here) fail with
/// a [`PlanError`].
pub fn plan_reanalysis(
    dataset: Option<Dataset>,
    variables: &[String],
    year: i32,
    month: Option<u32>,
    location: LatLon,
    time_zone: Option<i32>,
) -> Result<Vec<RequestSpec>, PlanError> {
    plan_reanalysis_at(dataset, variables, year, month, location, time_zone, now_utc())
}

/// [`plan_reanalysis`] with an explicit `now`, the deterministic core.
pub(crate) fn plan_reanalysis_at(
    dataset: Option<Dataset>,
    variables: &[String],
    year: i32,
    month: Option<u32>,
    location: LatLon,
    time_zone: Option<i32>,
    now: DateTime<Utc>,
) -> Result<Vec<RequestSpec>, PlanError> {
    if variables.is_empty() {
        return Err(PlanError::NoVariables);
    }
    if let Some(m) = month {
        if !(1..=12).contains(&m) {
            return Err(PlanError::InvalidMonth(m));
        }
    }

    let dataset = match dataset {
        Some(Dataset::CamsSolarRadiationTimeseries) => {
            return Err(PlanError::UnsupportedDataset(
                Dataset::CamsSolarRadiationTimeseries,
            ))
        }
        Some(ds) => ds,
        None => {
            if variables.len() != 1 {
                return Err(PlanError::AmbiguousDatasetSelection(variables.len()));
            }
            REANALYSIS_PRIORITY
                .iter()
                .copied()
                .find(|ds| ds.supports(&variables[0]))
                .ok_or_else(|| PlanError::UnsupportedVariable(variables[0].clone()))?
        }
    };

    // everything beyond `now` is unavailable, not an error
    if year > now.year() {
        return Ok(Vec::new());
    }
    if let Some(m) = month {
        if year == now.year() && m > now.month() {
            return Ok(Vec::new());
        }
    }

    let (month_start, month_end) = match month {
        Some(m) => (m, m),
        None if year == now.year() => (1, now.month()),
        None => (1, 12),
    };

    let main = if dataset.is_point_timeseries() {
        let start = NaiveDate::from_ymd_opt(year, month_start, 1)
            .ok_or(PlanError::InvalidMonth(month_start))?;
        let last_day =
            days_in_month(year, month_end).ok_or(PlanError::InvalidMonth(month_end))?;
        let end = NaiveDate::from_ymd_opt(year, month_end, last_day)
            .ok_or(PlanError::InvalidMonth(month_end))?
            .min(now.date_naive());
        RequestSpec::Timeseries {
            dataset,
            variables: variables.to_vec(),
            range: DateRange::new(start, end),
            location,
        }
    } else {
        let m = month.ok_or(PlanError::MonthRequired(dataset))?;
        RequestSpec::Gridded {
            dataset,
            variables: variables.to_vec(),
            year,
            month: m,
            days: request_days(year, m, now),
            location,
        }
    };

    let mut specs = vec![main];
    match time_zone {
        // local time ahead of UTC: the first local hours of Jan 1 live in
        // Dec 31 of the previous year
        Some(tz) if tz > 0 && month_start == 1 => {
            if let Some(day) = NaiveDate::from_ymd_opt(year - 1, 12, 31) {
                specs.push(boundary_spec(dataset, variables, location, day));
            }
        }
        // local time behind UTC: the last local hours of Dec 31 live in
        // Jan 1 of the next year
        Some(tz) if tz < 0 && month_end == 12 => {
            if let Some(day) = NaiveDate::from_ymd_opt(year + 1, 1, 1) {
                specs.push(boundary_spec(dataset, variables, location, day));
            }
        }
        _ => {}
    }

    Ok(specs)
}

/// A one-day request covering a time-zone boundary extension, in the shape
/// the dataset family requires.
fn boundary_spec(
    dataset: Dataset,
    variables: &[String],
    location: LatLon,
    day: NaiveDate,
) -> RequestSpec {
    if dataset.is_point_timeseries() {
        RequestSpec::Timeseries {
            dataset,
            variables: variables.to_vec(),
            range: DateRange::single_day(day),
            location,
        }
    } else {
        RequestSpec::Gridded {
            dataset,
            variables: variables.to_vec(),
            year: day.year(),
            month: day.month(),
            days: vec![format!("{:02}", day.day())],
            location,
        }
    }
}
