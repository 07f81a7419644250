//! Schema-driven check planning.
//!
//! Rules are evaluated in a fixed order so identical metadata always yields
//! the same check sequence:
//! 1. `missing_values` over every column
//! 2. `duplicate_id` for each identifier column
//! 3. `outlier_range` for each numeric, non-identifier column

use std::collections::HashSet;

use crate::config::PlannerConfig;
use crate::domain::check::{CheckSpec, OutlierParams};
use crate::domain::dataset::DatasetMetadata;
use crate::domain::error::InvalidMetadataError;
use crate::domain::plan::Plan;

/// Builds a [`Plan`] from dataset metadata.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Plan the checks for `metadata`. Every call gets a fresh plan id.
    pub fn make_plan(&self, metadata: &DatasetMetadata) -> Result<Plan, InvalidMetadataError> {
        validate_metadata(metadata)?;

        let mut checks = Vec::new();

        checks.push(CheckSpec::missing_values(
            metadata.columns.iter().map(|c| c.name.clone()).collect(),
        ));

        for column in &metadata.columns {
            if self.config.is_identifier(&column.name) {
                checks.push(CheckSpec::duplicate_id(column.name.clone()));
            }
        }

        for column in &metadata.columns {
            if column.dtype.is_numeric() && !self.config.is_identifier(&column.name) {
                checks.push(CheckSpec::outlier_range(
                    column.name.clone(),
                    self.outlier_params(&column.name),
                ));
            }
        }

        Ok(Plan::new(checks))
    }

    fn outlier_params(&self, column: &str) -> OutlierParams {
        let bounds = self
            .config
            .column_bounds
            .get(column)
            .copied()
            .unwrap_or_default();
        OutlierParams {
            threshold: self.config.outlier_threshold,
            lower: bounds.lower,
            upper: bounds.upper,
        }
    }
}

fn validate_metadata(metadata: &DatasetMetadata) -> Result<(), InvalidMetadataError> {
    if metadata.columns.is_empty() {
        return Err(InvalidMetadataError::NoColumns);
    }
    let mut seen = HashSet::new();
    for column in &metadata.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(InvalidMetadataError::DuplicateColumn {
                name: column.name.clone(),
            });
        }
    }
    Ok(())
}
