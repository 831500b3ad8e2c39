use crate::assembly::MergeError;
use crate::planning::error::PlanError;
use crate::transfer::error::TransferError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Era5PointError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to create temporary directory for intermediate files")]
    TempDirCreation(#[source] std::io::Error),
}
