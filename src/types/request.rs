//! Self-describing request specifications, one variant per dataset family.
//!
//! The remote APIs take loosely-shaped JSON whose fields depend on the
//! dataset; modelling the request as a tagged union keeps that shape-switch
//! in one place ([`RequestSpec::body`]) instead of scattering field-presence
//! checks through the file-naming and reassembly code.

use crate::calendar::DateRange;
use crate::era5point::LatLon;
use crate::types::dataset::Dataset;
use serde_json::{json, Value};

/// Sky handling for a CAMS solar radiation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyType {
    Clear,
    ObservedCloud,
}

impl SkyType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            SkyType::Clear => "clear",
            SkyType::ObservedCloud => "observed_cloud",
        }
    }
}

/// Temporal resolution of a CAMS solar radiation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    OneMinute,
    FifteenMinutes,
    OneHour,
    OneDay,
    OneMonth,
}

impl TimeStep {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TimeStep::OneMinute => "1minute",
            TimeStep::FifteenMinutes => "15minute",
            TimeStep::OneHour => "1hour",
            TimeStep::OneDay => "1day",
            TimeStep::OneMonth => "1month",
        }
    }
}

/// Time reference of a CAMS solar radiation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeReference {
    UniversalTime,
    TrueSolarTime,
}

impl TimeReference {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TimeReference::UniversalTime => "universal_time",
            TimeReference::TrueSolarTime => "true_solar_time",
        }
    }
}

/// An immutable description of one remote-archive call.
///
/// Produced by the planners, consumed by the
/// [`RequestExecutor`](crate::RequestExecutor) and by the intermediate
/// file-naming step. The variant determines both the JSON body shape and the
/// location encoding (point for the timeseries families, degenerate bounding
/// box for the gridded family).
#[derive(Debug, Clone, PartialEq)]
pub enum RequestSpec {
    /// One date-range request against a point-timeseries reanalysis dataset.
    Timeseries {
        dataset: Dataset,
        variables: Vec<String>,
        range: DateRange,
        location: LatLon,
    },
    /// One explicit year/month/day-list request against the gridded
    /// single-levels dataset. All 24 hours of each listed day are fetched.
    Gridded {
        dataset: Dataset,
        variables: Vec<String>,
        year: i32,
        month: u32,
        days: Vec<String>,
        location: LatLon,
    },
    /// One date-range request against the CAMS solar radiation dataset.
    Radiation {
        range: DateRange,
        location: LatLon,
        sky_type: SkyType,
        altitude: Vec<String>,
        time_step: TimeStep,
        time_reference: TimeReference,
    },
}

impl RequestSpec {
    pub fn dataset(&self) -> Dataset {
        match self {
            RequestSpec::Timeseries { dataset, .. } | RequestSpec::Gridded { dataset, .. } => {
                *dataset
            }
            RequestSpec::Radiation { .. } => Dataset::CamsSolarRadiationTimeseries,
        }
    }

    /// The requested variable names; empty for the radiation dataset, whose
    /// outputs are fixed by the query parameters.
    pub fn variables(&self) -> &[String] {
        match self {
            RequestSpec::Timeseries { variables, .. } | RequestSpec::Gridded { variables, .. } => {
                variables
            }
            RequestSpec::Radiation { .. } => &[],
        }
    }

    /// The `(year, month)` pairs this request covers, in chronological order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        match self {
            RequestSpec::Timeseries { range, .. } | RequestSpec::Radiation { range, .. } => {
                range.months()
            }
            RequestSpec::Gridded { year, month, .. } => vec![(*year, *month)],
        }
    }

    /// The JSON request body the remote API expects for this spec.
    ///
    /// This mapping is the collaborator contract with the CDS/ADS processing
    /// API; planners never look at it.
    pub fn body(&self) -> Value {
        match self {
            RequestSpec::Timeseries {
                variables,
                range,
                location,
                ..
            } => json!({
                "data_format": "netcdf",
                "variable": variables,
                "date": [range.to_string()],
                "location": {
                    "latitude": location.0,
                    "longitude": location.1,
                },
            }),
            RequestSpec::Gridded {
                variables,
                year,
                month,
                days,
                location,
                ..
            } => json!({
                "product_type": "reanalysis",
                "format": "netcdf",
                "variable": variables,
                "year": [year.to_string()],
                "month": [format!("{month:02}")],
                "day": days,
                "time": (0..24).map(|h| format!("{h:02}:00")).collect::<Vec<_>>(),
                "area": [location.0, location.1, location.0, location.1],
            }),
            RequestSpec::Radiation {
                range,
                location,
                sky_type,
                altitude,
                time_step,
                time_reference,
            } => json!({
                "sky_type": sky_type.as_str(),
                "location": {
                    "latitude": location.0,
                    "longitude": location.1,
                },
                "altitude": altitude,
                "date": [range.to_string()],
                "time_step": time_step.as_str(),
                "time_reference": time_reference.as_str(),
                "format": "netcdf",
            }),
        }
    }
}
