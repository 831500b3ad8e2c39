mod assembly;
mod calendar;
mod era5point;
mod error;
mod naming;
mod planning;
mod transfer;
mod types;

pub use error::Era5PointError;
pub use era5point::*;

pub use calendar::DateRange;
pub use types::dataset::Dataset;
pub use types::request::{RequestSpec, SkyType, TimeReference, TimeStep};

pub use assembly::{merge_segments, MergeError, TIME_COLUMN};
pub use naming::intermediate_paths;
pub use planning::error::PlanError;
pub use planning::radiation::plan_radiation;
pub use planning::reanalysis::plan_reanalysis;

pub use transfer::error::TransferError;
pub use transfer::executor::{CdsExecutor, RequestExecutor};
pub use transfer::loader::{CsvSegmentLoader, SegmentLoader};
