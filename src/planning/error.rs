use crate::types::dataset::Dataset;
use thiserror::Error;

/// Usage errors raised at planning time. These are caller mistakes and are
/// never retried; a request that is merely in the future is not an error and
/// planners signal it by producing no request instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Dynamic dataset selection requires exactly one variable, got {0}")]
    AmbiguousDatasetSelection(usize),

    #[error("No dataset supports variable '{0}'")]
    UnsupportedVariable(String),

    #[error("Month must be specified for the '{0}' dataset")]
    MonthRequired(Dataset),

    #[error("Dataset '{0}' cannot be used for reanalysis requests")]
    UnsupportedDataset(Dataset),

    #[error("Month {0} is not a valid calendar month")]
    InvalidMonth(u32),

    #[error("At least one variable must be requested")]
    NoVariables,

    #[error("The planned requests cover no months")]
    NoMonths,

    #[error("No requests can be scheduled for year {year} (variables: {variables:?})")]
    NothingToSchedule { year: i32, variables: Vec<String> },
}
