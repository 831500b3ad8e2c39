//! The main entry point for downloading Copernicus point time series.
//!
//! [`Era5Point`] wires the request planners to the two external
//! collaborators (request execution and segment loading), runs the planned
//! submissions on a bounded pool, and reassembles the downloaded segments
//! into one chronologically ordered `DataFrame`.

use crate::assembly::merge_segments;
use crate::error::Era5PointError;
use crate::naming::{intermediate_paths, segment_path};
use crate::planning::error::PlanError;
use crate::planning::radiation::plan_radiation;
use crate::planning::reanalysis::plan_reanalysis;
use crate::transfer::executor::{CdsExecutor, RequestExecutor};
use crate::transfer::loader::{CsvSegmentLoader, SegmentLoader};
use crate::types::dataset::Dataset;
use crate::types::request::{RequestSpec, SkyType, TimeReference, TimeStep};
use bon::bon;
use futures_util::future::try_join_all;
use log::info;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default number of concurrent submissions. Remote job slots are limited
/// per account, so the default stays small.
const DEFAULT_PARALLELISM: usize = 4;

const PROGRESS_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second
/// (index 1). Both values are represented as `f64`.
///
/// # Examples
///
/// ```
/// use era5point::LatLon;
///
/// let le_havre = LatLon(49.4, 0.1);
/// assert_eq!(le_havre.0, 49.4); // Latitude
/// assert_eq!(le_havre.1, 0.1); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

/// The main client for downloading ERA5 reanalysis and CAMS solar radiation
/// data for a single geographic point.
///
/// The client plans the dataset-specific requests, hands each one to a
/// [`RequestExecutor`], loads the resulting files through a
/// [`SegmentLoader`], and merges everything into one `DataFrame` indexed by
/// an ascending, duplicate-free `"time"` column.
///
/// Create an instance with [`Era5Point::new()`] (credentials from the
/// environment, CSV segment loading) or [`Era5Point::with_collaborators()`]
/// to inject custom transport/parsing.
pub struct Era5Point {
    executor: Arc<dyn RequestExecutor>,
    loader: Arc<dyn SegmentLoader>,
}

#[bon]
impl Era5Point {
    /// Creates a client with the production collaborators: a [`CdsExecutor`]
    /// configured from the environment (`CDSAPI_KEY`, optionally
    /// `ADSAPI_KEY` / `CDSAPI_URL` / `ADSAPI_URL`) and the
    /// [`CsvSegmentLoader`].
    ///
    /// # Errors
    ///
    /// Returns [`Era5PointError::Transfer`] when no API key is configured.
    pub fn new() -> Result<Self, Era5PointError> {
        Ok(Self::with_collaborators(
            Arc::new(CdsExecutor::from_env().map_err(Era5PointError::from)?),
            Arc::new(CsvSegmentLoader),
        ))
    }

    /// Creates a client with caller-supplied collaborators, e.g. a NetCDF
    /// loader or a stub executor in tests.
    pub fn with_collaborators(
        executor: Arc<dyn RequestExecutor>,
        loader: Arc<dyn SegmentLoader>,
    ) -> Self {
        Self { executor, loader }
    }

    /// Downloads one year of reanalysis data for a single point and returns
    /// the merged series.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.variables(Vec<String>)`: **Required.** The variables to request.
    /// * `.year(i32)`: **Required.** The year to cover; clamped to the
    ///   current month/day for the current year.
    /// * `.location(LatLon)`: **Required.** The point of interest.
    /// * `.dataset(Dataset)`: Optional. The dataset to query. When omitted
    ///   the dataset is selected per variable from the capability table.
    /// * `.time_zone(i32)`: Optional. Hour offset from UTC; a non-zero
    ///   offset fetches one extra boundary day so local-time conversion has
    ///   full coverage.
    /// * `.parallelism(usize)`: Optional. Concurrent submissions, default 4.
    ///   With `1`, a single whole-year request is made per plan instead of
    ///   splitting by month and variable.
    /// * `.output_dir(PathBuf)`: Optional. Directory for the intermediate
    ///   files, kept after the call. Defaults to a temporary directory that
    ///   is removed when the call returns.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] variants for usage mistakes, including
    /// [`PlanError::NothingToSchedule`] when the whole requested period lies
    /// in the future, and propagates the first [`crate::TransferError`] of
    /// the batch unmodified (aborting the remaining submissions).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use era5point::{Era5Point, Era5PointError, LatLon};
    /// # async fn run() -> Result<(), Era5PointError> {
    /// let client = Era5Point::new()?;
    /// let frame = client
    ///     .download_reanalysis()
    ///     .variables(vec!["2m_temperature".into(), "surface_pressure".into()])
    ///     .year(2021)
    ///     .location(LatLon(49.4, 0.1))
    ///     .call()
    ///     .await?;
    /// println!("{frame}");
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn download_reanalysis(
        &self,
        variables: Vec<String>,
        year: i32,
        location: LatLon,
        dataset: Option<Dataset>,
        time_zone: Option<i32>,
        parallelism: Option<usize>,
        output_dir: Option<PathBuf>,
    ) -> Result<DataFrame, Era5PointError> {
        if variables.is_empty() {
            return Err(PlanError::NoVariables.into());
        }
        let parallelism = parallelism.unwrap_or(DEFAULT_PARALLELISM).max(1);
        let work_dir = WorkDir::resolve(output_dir).await?;

        if parallelism == 1 {
            return self
                .download_whole_year(dataset, variables, year, location, time_zone, &work_dir)
                .await;
        }

        // split by month and variable so submissions can run independently
        let mut specs = Vec::new();
        for month in 1..=12 {
            for variable in &variables {
                specs.extend(plan_reanalysis(
                    dataset,
                    std::slice::from_ref(variable),
                    year,
                    Some(month),
                    location,
                    time_zone,
                )?);
            }
        }
        if specs.is_empty() {
            return Err(PlanError::NothingToSchedule { year, variables }.into());
        }

        let paths = intermediate_paths(work_dir.path(), &specs)?;
        info!("Running {} requests in parallel for {year}", specs.len());

        // best-effort progress observation, never on the completion path
        let poll = tokio::spawn(poll_progress(paths.clone()));

        let semaphore = Arc::new(Semaphore::new(parallelism));
        let submissions = specs.iter().map(|spec| {
            let executor = Arc::clone(&self.executor);
            let semaphore = Arc::clone(&semaphore);
            let path = single_segment_path(work_dir.path(), spec);
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("submission semaphore closed");
                executor.execute(spec, &path).await
            }
        });
        let outcome = try_join_all(submissions).await;
        poll.abort();
        outcome.map_err(Era5PointError::from)?;

        let mut segments = Vec::with_capacity(paths.len());
        for path in &paths {
            segments.push(self.loader.load(path).await?);
        }
        Ok(merge_segments(segments)?)
    }

    /// The serial path: one request covering the whole clamped year (plus a
    /// possible time-zone boundary request), executed sequentially.
    async fn download_whole_year(
        &self,
        dataset: Option<Dataset>,
        variables: Vec<String>,
        year: i32,
        location: LatLon,
        time_zone: Option<i32>,
        work_dir: &WorkDir,
    ) -> Result<DataFrame, Era5PointError> {
        let specs = plan_reanalysis(dataset, &variables, year, None, location, time_zone)?;
        if specs.is_empty() {
            return Err(PlanError::NothingToSchedule { year, variables }.into());
        }
        let mut segments = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            let path = work_dir.path().join(format!("era5_{year}_part{i}.nc"));
            self.executor.execute(spec, &path).await?;
            segments.push(self.loader.load(&path).await?);
        }
        Ok(merge_segments(segments)?)
    }

    /// Downloads one year of CAMS solar radiation data for a single point.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.location(LatLon)`: **Required.** The point of interest.
    /// * `.year(i32)`: **Required.** The year to cover.
    /// * `.sky_type(SkyType)`: Optional. Defaults to
    ///   [`SkyType::ObservedCloud`].
    /// * `.altitude(Vec<String>)`: Optional. Defaults to `["0"]`.
    /// * `.time_step(TimeStep)`: Optional. Defaults to [`TimeStep::OneHour`].
    /// * `.time_reference(TimeReference)`: Optional. Defaults to
    ///   [`TimeReference::UniversalTime`].
    /// * `.time_zone(i32)`: Optional. Hour offset from UTC. When unset the
    ///   range starts on Dec 31 of the previous year; an explicit `0` keeps
    ///   the plain Jan 1 start, and a negative offset pushes the end to
    ///   Jan 1 of the next year instead.
    /// * `.output_dir(PathBuf)`: Optional. As for reanalysis downloads.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::NothingToSchedule`] for a future year and
    /// propagates transport/format errors from the collaborators.
    #[builder]
    pub async fn download_radiation(
        &self,
        location: LatLon,
        year: i32,
        sky_type: Option<SkyType>,
        altitude: Option<Vec<String>>,
        time_step: Option<TimeStep>,
        time_reference: Option<TimeReference>,
        time_zone: Option<i32>,
        output_dir: Option<PathBuf>,
    ) -> Result<DataFrame, Era5PointError> {
        let spec = plan_radiation(
            location,
            year,
            sky_type.unwrap_or(SkyType::ObservedCloud),
            altitude.unwrap_or_else(|| vec!["0".to_string()]),
            time_step.unwrap_or(TimeStep::OneHour),
            time_reference.unwrap_or(TimeReference::UniversalTime),
            time_zone,
        )
        .ok_or(PlanError::NothingToSchedule {
            year,
            variables: Vec::new(),
        })?;

        let work_dir = WorkDir::resolve(output_dir).await?;
        let path = work_dir.path().join(format!("cams_radiation_{year}.nc"));
        self.executor.execute(&spec, &path).await?;
        let segment = self.loader.load(&path).await?;
        Ok(merge_segments(vec![segment])?)
    }
}

/// Path for a spec on the parallel path, which is single-month and
/// single-variable by construction.
fn single_segment_path(dir: &Path, spec: &RequestSpec) -> PathBuf {
    let (year, month) = spec.months()[0];
    segment_path(dir, year, month, &spec.variables()[0])
}

/// Logs which intermediate files exist yet. Purely observational: reads the
/// file set, never touches scheduling.
async fn poll_progress(paths: Vec<PathBuf>) {
    let total = paths.len();
    loop {
        tokio::time::sleep(PROGRESS_POLL_INTERVAL).await;
        let done = paths.iter().filter(|p| p.exists()).count();
        info!("{done}/{total} segment files present");
        if done == total {
            return;
        }
    }
}

/// The directory intermediate files go to: caller-supplied (kept) or
/// temporary (removed on drop).
enum WorkDir {
    Temp(tempfile::TempDir),
    Dir(PathBuf),
}

impl WorkDir {
    async fn resolve(output_dir: Option<PathBuf>) -> Result<Self, Era5PointError> {
        match output_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| Era5PointError::OutputDirCreation(dir.clone(), e))?;
                Ok(WorkDir::Dir(dir))
            }
            None => tempfile::tempdir()
                .map(WorkDir::Temp)
                .map_err(Era5PointError::TempDirCreation),
        }
    }

    fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(dir) => dir.path(),
            WorkDir::Dir(dir) => dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DateRange;
    use crate::transfer::error::TransferError;
    use async_trait::async_trait;

    /// Writes a deterministic hourly CSV for whatever span the spec covers.
    struct StubExecutor;

    fn write_csv(range: DateRange, variables: &[String]) -> String {
        let mut csv = String::from("time");
        for variable in variables {
            csv.push(',');
            csv.push_str(variable);
        }
        csv.push('\n');
        let mut day = range.start;
        while day <= range.end {
            for hour in 0..24 {
                csv.push_str(&format!("{day}T{hour:02}:00:00"));
                for _ in variables {
                    csv.push_str(",1.5");
                }
                csv.push('\n');
            }
            day = day.succ_opt().unwrap();
        }
        csv
    }

    #[async_trait]
    impl RequestExecutor for StubExecutor {
        async fn execute(
            &self,
            spec: &RequestSpec,
            destination: &Path,
        ) -> Result<(), TransferError> {
            let csv = match spec {
                RequestSpec::Timeseries {
                    range, variables, ..
                } => write_csv(*range, variables),
                RequestSpec::Radiation { range, .. } => {
                    write_csv(*range, &["global_horizontal_irradiance".to_string()])
                }
                other => panic!("stub executor only handles timeseries specs, got {other:?}"),
            };
            tokio::fs::write(destination, csv)
                .await
                .map_err(|e| TransferError::DestinationIo(destination.to_path_buf(), e))
        }
    }

    /// Fails July submissions to exercise batch abort.
    struct FailingExecutor;

    #[async_trait]
    impl RequestExecutor for FailingExecutor {
        async fn execute(
            &self,
            spec: &RequestSpec,
            destination: &Path,
        ) -> Result<(), TransferError> {
            if spec.months()[0].1 == 7 {
                return Err(TransferError::DestinationIo(
                    destination.to_path_buf(),
                    std::io::Error::new(std::io::ErrorKind::Other, "boom"),
                ));
            }
            StubExecutor.execute(spec, destination).await
        }
    }

    fn stub_client() -> Era5Point {
        Era5Point::with_collaborators(Arc::new(StubExecutor), Arc::new(CsvSegmentLoader))
    }

    fn test_variables() -> Vec<String> {
        vec!["2m_temperature".to_string(), "surface_pressure".to_string()]
    }

    #[tokio::test]
    async fn test_download_reanalysis_full_past_year() -> Result<(), Era5PointError> {
        let frame = stub_client()
            .download_reanalysis()
            .variables(test_variables())
            .year(2021)
            .location(LatLon(49.4, 0.1))
            .dataset(Dataset::Era5SingleLevelsTimeseries)
            .parallelism(3)
            .call()
            .await?;

        // 365 days of hourly data, one column per variable plus time
        assert_eq!(frame.height(), 8760);
        assert_eq!(frame.width(), 3);
        let names = frame.get_column_names();
        assert!(names.iter().any(|n| n.as_str() == "2m_temperature"));
        assert!(names.iter().any(|n| n.as_str() == "surface_pressure"));

        let times: Vec<i64> = frame
            .column("time")
            .unwrap()
            .datetime()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[tokio::test]
    async fn test_download_reanalysis_with_time_zone_extension() -> Result<(), Era5PointError> {
        let frame = stub_client()
            .download_reanalysis()
            .variables(vec!["2m_temperature".to_string()])
            .year(2021)
            .location(LatLon(49.4, 0.1))
            .dataset(Dataset::Era5SingleLevelsTimeseries)
            .time_zone(5)
            .call()
            .await?;

        // one extra day (Dec 31 of 2020) ahead of the year
        assert_eq!(frame.height(), 8760 + 24);
        Ok(())
    }

    #[tokio::test]
    async fn test_download_reanalysis_serial_path() -> Result<(), Era5PointError> {
        let frame = stub_client()
            .download_reanalysis()
            .variables(test_variables())
            .year(2021)
            .location(LatLon(49.4, 0.1))
            .dataset(Dataset::Era5SingleLevelsTimeseries)
            .parallelism(1)
            .call()
            .await?;

        assert_eq!(frame.height(), 8760);
        assert_eq!(frame.width(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_download_reanalysis_future_year_fails_clearly() {
        let err = stub_client()
            .download_reanalysis()
            .variables(vec!["2m_temperature".to_string()])
            .year(9999)
            .location(LatLon(49.4, 0.1))
            .dataset(Dataset::Era5SingleLevelsTimeseries)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Era5PointError::Plan(PlanError::NothingToSchedule { year: 9999, .. })
        ));
    }

    #[tokio::test]
    async fn test_download_reanalysis_keeps_files_in_output_dir() -> Result<(), Era5PointError> {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("segments");
        stub_client()
            .download_reanalysis()
            .variables(vec!["2m_temperature".to_string()])
            .year(2021)
            .location(LatLon(49.4, 0.1))
            .dataset(Dataset::Era5SingleLevelsTimeseries)
            .output_dir(out.clone())
            .call()
            .await?;

        let written = std::fs::read_dir(&out).unwrap().count();
        assert_eq!(written, 12);
        assert!(out.join("era5_2021_01_2m_temperature.nc").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_submission_aborts_batch() {
        let client =
            Era5Point::with_collaborators(Arc::new(FailingExecutor), Arc::new(CsvSegmentLoader));
        let err = client
            .download_reanalysis()
            .variables(vec!["2m_temperature".to_string()])
            .year(2021)
            .location(LatLon(49.4, 0.1))
            .dataset(Dataset::Era5SingleLevelsTimeseries)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, Era5PointError::Transfer(_)));
    }

    #[tokio::test]
    async fn test_download_radiation_past_year() -> Result<(), Era5PointError> {
        let frame = stub_client()
            .download_radiation()
            .location(LatLon(49.4, 0.1))
            .year(2021)
            .call()
            .await?;

        // the default range starts on Dec 31 of the previous year
        assert_eq!(frame.height(), 8760 + 24);
        let names = frame.get_column_names();
        assert!(names
            .iter()
            .any(|n| n.as_str() == "global_horizontal_irradiance"));
        Ok(())
    }

    #[tokio::test]
    async fn test_download_radiation_zero_offset_covers_exact_year() -> Result<(), Era5PointError>
    {
        let frame = stub_client()
            .download_radiation()
            .location(LatLon(49.4, 0.1))
            .year(2021)
            .time_zone(0)
            .call()
            .await?;

        assert_eq!(frame.height(), 8760);
        Ok(())
    }

    #[tokio::test]
    async fn test_download_radiation_future_year_fails_clearly() {
        let err = stub_client()
            .download_radiation()
            .location(LatLon(49.4, 0.1))
            .year(9999)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Era5PointError::Plan(PlanError::NothingToSchedule { year: 9999, .. })
        ));
    }
}
