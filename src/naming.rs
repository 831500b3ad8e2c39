//! Deterministic naming for the intermediate per-segment files.
//!
//! One file per (year, month, variable) triple across all planned requests.
//! The order of the returned list fixes the on-disk iteration order
//! downstream: months in first-seen order crossed with variables in
//! first-seen order, months outer. Writers never share a path because each
//! triple is unique.

use crate::planning::error::PlanError;
use crate::types::request::RequestSpec;
use std::path::{Path, PathBuf};

/// The file path for one (year, month, variable) triple.
pub(crate) fn segment_path(dir: &Path, year: i32, month: u32, variable: &str) -> PathBuf {
    dir.join(format!("era5_{year}_{month:02}_{variable}.nc"))
}

/// Derives the ordered list of intermediate file paths for a set of planned
/// requests, one per (year, month, variable) triple they cover.
///
/// Fails with [`PlanError::NoMonths`] or [`PlanError::NoVariables`] when the
/// specs cover no months or carry no variables at all.
pub fn intermediate_paths(dir: &Path, specs: &[RequestSpec]) -> Result<Vec<PathBuf>, PlanError> {
    let mut months: Vec<(i32, u32)> = Vec::new();
    let mut variables: Vec<&str> = Vec::new();
    for spec in specs {
        for month in spec.months() {
            if !months.contains(&month) {
                months.push(month);
            }
        }
        for variable in spec.variables() {
            if !variables.iter().any(|v| v == variable) {
                variables.push(variable);
            }
        }
    }

    if months.is_empty() {
        return Err(PlanError::NoMonths);
    }
    if variables.is_empty() {
        return Err(PlanError::NoVariables);
    }

    Ok(months
        .iter()
        .flat_map(|(year, month)| {
            variables
                .iter()
                .map(|variable| segment_path(dir, *year, *month, variable))
        })
        .collect())
}
