//! Submission of planned requests to the CDS/ADS processing API.
//!
//! The [`RequestExecutor`] trait is the narrow seam the client drives; the
//! shipped [`CdsExecutor`] speaks the Copernicus retrieve API: submit the
//! request as a processing job, poll the job until it completes, then stream
//! the result asset to the destination file. Retry policy is deliberately
//! absent; failures propagate to the caller.

use crate::transfer::error::TransferError;
use crate::types::dataset::Dataset;
use crate::types::request::RequestSpec;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::StreamReader;

/// Key of the authentication header the Copernicus services expect.
const AUTH_HEADER: &str = "PRIVATE-TOKEN";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Executes one fully-formed request, producing a file at the destination.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, spec: &RequestSpec, destination: &Path) -> Result<(), TransferError>;
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: JobAsset,
}

#[derive(Debug, Deserialize)]
struct JobAsset {
    value: JobAssetValue,
}

#[derive(Debug, Deserialize)]
struct JobAssetValue {
    href: String,
}

/// The production executor for the Climate Data Store and Atmosphere Data
/// Store. One instance serves both services; the endpoint is taken from the
/// request's dataset, the matching key from the executor's credentials.
pub struct CdsExecutor {
    client: reqwest::Client,
    cds_url: String,
    ads_url: String,
    cds_key: String,
    ads_key: String,
    poll_interval: Duration,
}

impl CdsExecutor {
    /// Creates an executor with explicit API keys. The ADS key may equal the
    /// CDS key; Copernicus accounts usually share one.
    pub fn new(cds_key: impl Into<String>, ads_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cds_url: Dataset::Era5SingleLevels.endpoint().to_string(),
            ads_url: Dataset::CamsSolarRadiationTimeseries.endpoint().to_string(),
            cds_key: cds_key.into(),
            ads_key: ads_key.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Creates an executor from the environment: `CDSAPI_KEY` (required),
    /// `ADSAPI_KEY` (defaults to the CDS key), and optional `CDSAPI_URL` /
    /// `ADSAPI_URL` endpoint overrides.
    pub fn from_env() -> Result<Self, TransferError> {
        let cds_key =
            std::env::var("CDSAPI_KEY").map_err(|_| TransferError::MissingApiKey("CDSAPI_KEY"))?;
        let ads_key = std::env::var("ADSAPI_KEY").unwrap_or_else(|_| cds_key.clone());
        let mut executor = Self::new(cds_key, ads_key);
        if let Ok(url) = std::env::var("CDSAPI_URL") {
            executor.cds_url = url;
        }
        if let Ok(url) = std::env::var("ADSAPI_URL") {
            executor.ads_url = url;
        }
        Ok(executor)
    }

    fn credentials_for(&self, dataset: Dataset) -> (&str, &str) {
        if dataset == Dataset::CamsSolarRadiationTimeseries {
            (&self.ads_url, &self.ads_key)
        } else {
            (&self.cds_url, &self.cds_key)
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        key: &str,
    ) -> Result<T, TransferError> {
        let response = self
            .client
            .get(url)
            .header(AUTH_HEADER, key)
            .send()
            .await
            .map_err(|e| TransferError::NetworkRequest(url.to_string(), e))?;
        let response = check_status(response, url)?;
        response
            .json::<T>()
            .await
            .map_err(|source| TransferError::MalformedResponse {
                url: url.to_string(),
                source,
            })
    }

    async fn submit(
        &self,
        endpoint: &str,
        key: &str,
        spec: &RequestSpec,
    ) -> Result<JobStatus, TransferError> {
        let url = format!(
            "{endpoint}/retrieve/v1/processes/{}/execution",
            spec.dataset().id()
        );
        debug!("Submitting request to {url}");
        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, key)
            .json(&json!({ "inputs": spec.body() }))
            .send()
            .await
            .map_err(|e| TransferError::NetworkRequest(url.clone(), e))?;
        let response = check_status(response, &url)?;
        response
            .json::<JobStatus>()
            .await
            .map_err(|source| TransferError::MalformedResponse { url, source })
    }

    async fn wait_for_completion(
        &self,
        endpoint: &str,
        key: &str,
        dataset: Dataset,
        mut job: JobStatus,
    ) -> Result<String, TransferError> {
        let url = format!("{endpoint}/retrieve/v1/jobs/{}", job.job_id);
        loop {
            match job.status.as_str() {
                "successful" => return Ok(job.job_id),
                "failed" | "dismissed" => {
                    warn!(
                        "Job {} for dataset {dataset} ended with status '{}'",
                        job.job_id, job.status
                    );
                    return Err(TransferError::RemoteJobFailed {
                        dataset,
                        job_id: job.job_id,
                        status: job.status,
                    });
                }
                // "accepted" / "running"
                _ => tokio::time::sleep(self.poll_interval).await,
            }
            job = self.get_json(&url, key).await?;
        }
    }

    async fn download_result(
        &self,
        endpoint: &str,
        key: &str,
        job_id: &str,
        destination: &Path,
    ) -> Result<(), TransferError> {
        let results_url = format!("{endpoint}/retrieve/v1/jobs/{job_id}/results");
        let results: JobResults = self.get_json(&results_url, key).await?;
        let href = results.asset.value.href;

        let response = self
            .client
            .get(&href)
            .header(AUTH_HEADER, key)
            .send()
            .await
            .map_err(|e| TransferError::NetworkRequest(href.clone(), e))?;
        let response = check_status(response, &href)?;

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| TransferError::DestinationIo(destination.to_path_buf(), e))?;
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| TransferError::DestinationIo(destination.to_path_buf(), e))?;
        info!("Wrote {written} bytes to {destination:?}");
        Ok(())
    }
}

#[async_trait]
impl RequestExecutor for CdsExecutor {
    async fn execute(&self, spec: &RequestSpec, destination: &Path) -> Result<(), TransferError> {
        let dataset = spec.dataset();
        let (endpoint, key) = self.credentials_for(dataset);
        let (endpoint, key) = (endpoint.to_string(), key.to_string());

        let job = self.submit(&endpoint, &key, spec).await?;
        info!(
            "Submitted job {} for dataset {dataset} (status '{}')",
            job.job_id, job.status
        );
        let job_id = self.wait_for_completion(&endpoint, &key, dataset, job).await?;
        self.download_result(&endpoint, &key, &job_id, destination)
            .await
    }
}

fn check_status(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, TransferError> {
    match response.error_for_status() {
        Ok(response) => Ok(response),
        Err(e) => {
            warn!("HTTP error for {url}: {e:?}");
            Err(if let Some(status) = e.status() {
                TransferError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                TransferError::NetworkRequest(url.to_string(), e)
            })
        }
    }
}
