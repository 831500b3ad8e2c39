//! The remote datasets this crate knows how to query, and the static
//! capability table used for dynamic dataset selection.

use std::fmt;

pub(crate) const CDS_API_URL: &str = "https://cds.climate.copernicus.eu/api";
pub(crate) const ADS_API_URL: &str = "https://ads.atmosphere.copernicus.eu/api";

/// A remote dataset on the Climate Data Store or Atmosphere Data Store.
///
/// The three reanalysis datasets differ in shape: the two timeseries datasets
/// take a single date range and a point location, while
/// [`Dataset::Era5SingleLevels`] is a gridded dataset that needs explicit
/// day/time enumeration and a bounding box even for a single point. The
/// timeseries datasets are faster to download but cover fewer variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Point-timeseries access to the ERA5 single-levels reanalysis.
    Era5SingleLevelsTimeseries,
    /// Point-timeseries access to the ERA5-Land reanalysis.
    Era5LandTimeseries,
    /// The full gridded ERA5 single-levels reanalysis. Covers all variables.
    Era5SingleLevels,
    /// CAMS solar radiation timeseries on the Atmosphere Data Store.
    CamsSolarRadiationTimeseries,
}

/// Priority order for dynamic dataset selection: timeseries datasets first
/// (faster), the full gridded dataset as the catch-all.
pub(crate) const REANALYSIS_PRIORITY: [Dataset; 3] = [
    Dataset::Era5SingleLevelsTimeseries,
    Dataset::Era5LandTimeseries,
    Dataset::Era5SingleLevels,
];

impl Dataset {
    /// The dataset identifier the remote API expects.
    pub fn id(&self) -> &'static str {
        match self {
            Dataset::Era5SingleLevelsTimeseries => "reanalysis-era5-single-levels-timeseries",
            Dataset::Era5LandTimeseries => "reanalysis-era5-land-timeseries",
            Dataset::Era5SingleLevels => "reanalysis-era5-single-levels",
            Dataset::CamsSolarRadiationTimeseries => "cams-solar-radiation-timeseries",
        }
    }

    /// Base URL of the service hosting this dataset.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Dataset::CamsSolarRadiationTimeseries => ADS_API_URL,
            _ => CDS_API_URL,
        }
    }

    pub(crate) fn is_point_timeseries(&self) -> bool {
        matches!(
            self,
            Dataset::Era5SingleLevelsTimeseries | Dataset::Era5LandTimeseries
        )
    }

    /// Variables this dataset can serve; `["*"]` means all.
    pub(crate) fn supported_variables(&self) -> &'static [&'static str] {
        match self {
            Dataset::Era5SingleLevelsTimeseries => &[
                "2m_dewpoint_temperature",
                "2m_temperature",
                "total_precipitation",
                "10m_u_component_of_wind",
                "10m_v_component_of_wind",
                "surface_pressure",
            ],
            Dataset::Era5LandTimeseries => &["soil_temperature_level_1"],
            Dataset::Era5SingleLevels => &["*"],
            Dataset::CamsSolarRadiationTimeseries => &[],
        }
    }

    pub(crate) fn supports(&self, variable: &str) -> bool {
        let vars = self.supported_variables();
        vars == ["*"] || vars.contains(&variable)
    }
}

/// Formats a `Dataset` as its remote identifier.
///
/// ```
/// use era5point::Dataset;
///
/// assert_eq!(
///     Dataset::Era5SingleLevels.to_string(),
///     "reanalysis-era5-single-levels"
/// );
/// ```
impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
