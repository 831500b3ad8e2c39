use crate::types::dataset::Dataset;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Transport and format errors from the download/load collaborators. These
/// propagate unmodified; the first one aborts the whole submission batch.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Missing API key; pass one explicitly or set {0}")]
    MissingApiKey(&'static str),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed response from {url}")]
    MalformedResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Remote processing failed for dataset {dataset} (job {job_id}, status '{status}')")]
    RemoteJobFailed {
        dataset: Dataset,
        job_id: String,
        status: String,
    },

    #[error("Failed to write downloaded data to '{0}'")]
    DestinationIo(PathBuf, #[source] std::io::Error),

    #[error("Segment file '{0}' could not be read")]
    SegmentRead(PathBuf, #[source] std::io::Error),

    #[error("Segment file '{0}' could not be parsed")]
    SegmentParse(PathBuf, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
