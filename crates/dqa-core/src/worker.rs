//! Check execution.
//!
//! [`Worker::run_check`] never fails: anything that prevents a check from
//! running is returned as a [`CheckResult`] with status `error`.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::check::{CheckKind, CheckResult, CheckSpec, Metric, OutlierParams};
use crate::domain::dataset::{CellValue, DatasetError, DatasetHandle, DatasetMetadata, GroupKey};
use crate::domain::error::CheckExecutionError;

type Outcome = Result<(Metric, Vec<usize>), CheckExecutionError>;

/// Stateless check executor. Only reads from the dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Worker;

impl Worker {
    pub fn new() -> Self {
        Self
    }

    /// Run one check against `dataset`.
    pub fn run_check(&self, spec: &CheckSpec, dataset: &dyn DatasetHandle) -> CheckResult {
        match execute(spec, dataset) {
            Ok((metric, affected_rows)) => CheckResult::completed(spec, metric, affected_rows),
            Err(e) => {
                tracing::debug!(check = %spec.name(), error = %e, "check could not run");
                CheckResult::error(spec, e.to_string())
            }
        }
    }
}

fn execute(spec: &CheckSpec, dataset: &dyn DatasetHandle) -> Outcome {
    if spec.target_columns.is_empty() {
        return Err(CheckExecutionError::NoTargetColumns);
    }
    let metadata = dataset.metadata()?;
    for name in &spec.target_columns {
        if metadata.column(name).is_none() {
            return Err(CheckExecutionError::UnknownColumn {
                column: name.clone(),
            });
        }
    }

    match &spec.kind {
        CheckKind::MissingValues => missing_values(&spec.target_columns, dataset),
        CheckKind::DuplicateId => duplicate_id(&spec.target_columns, dataset),
        CheckKind::OutlierRange(params) => {
            outlier_range(&spec.target_columns, params, &metadata, dataset)
        }
    }
}

/// Null count per column; affected rows are those with any missing target.
fn missing_values(targets: &[String], dataset: &dyn DatasetHandle) -> Outcome {
    let mut counts = BTreeMap::new();
    let mut affected = BTreeSet::new();

    for name in targets {
        let mut missing = 0u64;
        for (row, cell) in dataset.column(name)?.iter().enumerate() {
            if cell.is_missing() {
                missing += 1;
                affected.insert(row);
            }
        }
        counts.insert(name.clone(), missing);
    }

    Ok((Metric::PerColumn(counts), affected.into_iter().collect()))
}

/// Groups rows by the (composite) key of the target columns. Rows with a
/// missing key component are not grouped.
fn duplicate_id(targets: &[String], dataset: &dyn DatasetHandle) -> Outcome {
    let columns = targets
        .iter()
        .map(|name| dataset.column(name))
        .collect::<Result<Vec<&[CellValue]>, DatasetError>>()?;

    let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
    for (name, cells) in targets.iter().zip(&columns) {
        if cells.len() != row_count {
            return Err(DatasetError::RaggedColumn {
                name: name.clone(),
                expected: row_count,
                actual: cells.len(),
            }
            .into());
        }
    }

    let mut groups: BTreeMap<Vec<GroupKey>, Vec<usize>> = BTreeMap::new();
    for row in 0..row_count {
        let key: Option<Vec<GroupKey>> = columns.iter().map(|c| c[row].group_key()).collect();
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }

    let mut duplicate_groups = 0u64;
    let mut affected = Vec::new();
    for rows in groups.values().filter(|rows| rows.len() > 1) {
        duplicate_groups += 1;
        affected.extend_from_slice(rows);
    }
    affected.sort_unstable();

    Ok((Metric::Count(duplicate_groups), affected))
}

fn outlier_range(
    targets: &[String],
    params: &OutlierParams,
    metadata: &DatasetMetadata,
    dataset: &dyn DatasetHandle,
) -> Outcome {
    validate_outlier_params(params)?;

    let mut outliers = BTreeSet::new();
    for name in targets {
        let dtype = metadata
            .column(name)
            .map(|c| c.dtype)
            .ok_or_else(|| CheckExecutionError::UnknownColumn {
                column: name.clone(),
            })?;
        if !dtype.is_numeric() {
            return Err(CheckExecutionError::TypeMismatch {
                column: name.clone(),
                actual: dtype.to_string(),
                expected: "int or float".to_string(),
            });
        }

        let values = numeric_values(name, dataset.column(name)?)?;
        outliers.extend(column_outliers(&values, params));
    }

    Ok((
        Metric::Count(outliers.len() as u64),
        outliers.into_iter().collect(),
    ))
}

fn validate_outlier_params(params: &OutlierParams) -> Result<(), CheckExecutionError> {
    if !params.threshold.is_finite() || params.threshold <= 0.0 {
        return Err(CheckExecutionError::InvalidParams(format!(
            "threshold must be a positive finite number, got {}",
            params.threshold
        )));
    }
    for bound in [params.lower, params.upper].into_iter().flatten() {
        if bound.is_nan() {
            return Err(CheckExecutionError::InvalidParams(
                "bounds must not be NaN".to_string(),
            ));
        }
    }
    if let (Some(lower), Some(upper)) = (params.lower, params.upper) {
        if lower > upper {
            return Err(CheckExecutionError::InvalidParams(format!(
                "lower bound {lower} exceeds upper bound {upper}"
            )));
        }
    }
    Ok(())
}

/// Non-missing values of a numeric column with their row indices.
fn numeric_values(
    column: &str,
    cells: &[CellValue],
) -> Result<Vec<(usize, f64)>, CheckExecutionError> {
    let mut values = Vec::with_capacity(cells.len());
    for (row, cell) in cells.iter().enumerate() {
        if cell.is_missing() {
            continue;
        }
        match cell.as_f64() {
            Some(v) => values.push((row, v)),
            None => {
                return Err(DatasetError::InvalidCell {
                    column: column.to_string(),
                    row,
                    reason: format!("non-numeric value {cell:?} in numeric column"),
                }
                .into())
            }
        }
    }
    Ok(values)
}

/// Rows of one column that are outliers.
///
/// Statistics use finite values only. With fewer than two of them, or zero
/// spread, the column has no outliers. Otherwise infinite values are always
/// outliers.
///
/// Mean and stddev are taken over values divided by their largest magnitude,
/// which keeps the squared deviations finite for values near `f64::MAX`.
fn column_outliers(values: &[(usize, f64)], params: &OutlierParams) -> Vec<usize> {
    let finite: Vec<f64> = values
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| v.is_finite())
        .collect();
    let n = finite.len();
    let scale = finite.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if n < 2 || scale == 0.0 {
        return Vec::new();
    }

    let mean = finite.iter().map(|v| v / scale).sum::<f64>() / n as f64;
    let variance = finite
        .iter()
        .map(|v| (v / scale - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let stddev = variance.sqrt();
    if stddev == 0.0 || !stddev.is_finite() {
        return Vec::new();
    }

    let limit = params.threshold * stddev;
    values
        .iter()
        .filter(|(_, v)| {
            !v.is_finite()
                || (v / scale - mean).abs() > limit
                || params.lower.is_some_and(|lower| *v < lower)
                || params.upper.is_some_and(|upper| *v > upper)
        })
        .map(|(row, _)| *row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::check::{CheckName, CheckStatus};
    use crate::domain::dataset::{ColumnSpec, Dtype, Table};

    fn floats(name: &str, values: &[Option<f64>]) -> (ColumnSpec, Vec<CellValue>) {
        (
            ColumnSpec::new(name, Dtype::Float),
            values
                .iter()
                .map(|v| v.map(CellValue::Float).unwrap_or(CellValue::Null))
                .collect(),
        )
    }

    fn ints(name: &str, values: &[Option<i64>]) -> (ColumnSpec, Vec<CellValue>) {
        (
            ColumnSpec::new(name, Dtype::Int),
            values
                .iter()
                .map(|v| v.map(CellValue::Int).unwrap_or(CellValue::Null))
                .collect(),
        )
    }

    fn bounded(upper: f64) -> OutlierParams {
        OutlierParams {
            upper: Some(upper),
            ..OutlierParams::default()
        }
    }

    #[test]
    fn missing_values_on_demo() {
        let result = Worker.run_check(
            &CheckSpec::missing_values(vec!["id".into(), "amount".into()]),
            &Table::demo(),
        );
        assert_eq!(result.status, CheckStatus::Failed);
        assert_eq!(result.affected_rows, vec![1]);
        let Some(Metric::PerColumn(counts)) = result.metric else {
            panic!("expected per-column metric");
        };
        assert_eq!(counts["id"], 0);
        assert_eq!(counts["amount"], 1);
    }

    #[test]
    fn missing_values_passes_on_complete_data() {
        let table = Table::new(vec![ints("a", &[Some(1), Some(2)])]).unwrap();
        let result = Worker.run_check(&CheckSpec::missing_values(vec!["a".into()]), &table);
        assert_eq!(result.status, CheckStatus::Passed);
        assert!(result.affected_rows.is_empty());
    }

    #[test]
    fn duplicate_id_on_demo() {
        let result = Worker.run_check(&CheckSpec::duplicate_id("id"), &Table::demo());
        assert_eq!(result.check, CheckName::DuplicateId);
        assert_eq!(result.status, CheckStatus::Failed);
        assert_eq!(result.metric, Some(Metric::Count(1)));
        assert_eq!(result.affected_rows, vec![1, 2]);
    }

    #[test]
    fn duplicate_id_ignores_null_ids() {
        let table = Table::new(vec![ints("id", &[None, Some(1), None, Some(2)])]).unwrap();
        let result = Worker.run_check(&CheckSpec::duplicate_id("id"), &table);
        assert_eq!(result.status, CheckStatus::Passed);
        assert_eq!(result.metric, Some(Metric::Count(0)));
    }

    #[test]
    fn duplicate_id_counts_groups_not_rows() {
        let table = Table::new(vec![ints(
            "id",
            &[Some(7), Some(8), Some(7), Some(8), Some(7), Some(9)],
        )])
        .unwrap();
        let result = Worker.run_check(&CheckSpec::duplicate_id("id"), &table);
        assert_eq!(result.metric, Some(Metric::Count(2)));
        assert_eq!(result.affected_rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn duplicate_id_composite_key() {
        let table = Table::new(vec![
            ints("order_id", &[Some(1), Some(1), Some(2)]),
            ints("line_id", &[Some(1), Some(2), Some(1)]),
        ])
        .unwrap();
        let spec = CheckSpec {
            kind: CheckKind::DuplicateId,
            target_columns: vec!["order_id".into(), "line_id".into()],
        };
        assert_eq!(Worker.run_check(&spec, &table).status, CheckStatus::Passed);
    }

    #[test]
    fn outlier_z_rule_alone_cannot_flag_three_values() {
        // max |z| for three samples is 2/sqrt(3) ~ 1.15
        let result = Worker.run_check(
            &CheckSpec::outlier_range("amount", OutlierParams::default()),
            &Table::demo(),
        );
        assert_eq!(result.status, CheckStatus::Passed);
        assert_eq!(result.metric, Some(Metric::Count(0)));
    }

    #[test]
    fn outlier_upper_bound_flags_demo_amount() {
        let result = Worker.run_check(
            &CheckSpec::outlier_range("amount", bounded(1000.0)),
            &Table::demo(),
        );
        assert_eq!(result.status, CheckStatus::Failed);
        assert_eq!(result.metric, Some(Metric::Count(1)));
        assert_eq!(result.affected_rows, vec![2]);
    }

    #[test]
    fn outlier_z_rule_flags_spike() {
        let mut values: Vec<Option<f64>> = (0..20).map(|i| Some(10.0 + (i % 3) as f64)).collect();
        values.push(Some(500.0));
        let table = Table::new(vec![floats("x", &values)]).unwrap();
        let result = Worker.run_check(
            &CheckSpec::outlier_range("x", OutlierParams::default()),
            &table,
        );
        assert_eq!(result.status, CheckStatus::Failed);
        assert_eq!(result.affected_rows, vec![20]);
    }

    #[test]
    fn outlier_constant_column_passes_even_with_bounds() {
        let table = Table::new(vec![floats("x", &[Some(5000.0); 6])]).unwrap();
        let result = Worker.run_check(&CheckSpec::outlier_range("x", bounded(1.0)), &table);
        assert_eq!(result.status, CheckStatus::Passed);
        assert_eq!(result.metric, Some(Metric::Count(0)));
    }

    #[test]
    fn outlier_single_value_passes() {
        let table = Table::new(vec![floats("x", &[Some(1.0), None, None])]).unwrap();
        let result = Worker.run_check(
            &CheckSpec::outlier_range("x", OutlierParams::default()),
            &table,
        );
        assert_eq!(result.status, CheckStatus::Passed);
        assert_eq!(result.metric, Some(Metric::Count(0)));
    }

    #[test]
    fn outlier_bounds_hold_for_huge_magnitudes() {
        let table =
            Table::new(vec![floats("x", &[Some(1e300), Some(-1e300), Some(5.0)])]).unwrap();
        let params = OutlierParams {
            lower: Some(-1000.0),
            upper: Some(1000.0),
            ..OutlierParams::default()
        };
        let result = Worker.run_check(&CheckSpec::outlier_range("x", params), &table);
        assert_eq!(result.status, CheckStatus::Failed);
        assert_eq!(result.metric, Some(Metric::Count(2)));
        assert_eq!(result.affected_rows, vec![0, 1]);
    }

    #[test]
    fn outlier_z_rule_near_float_max() {
        let mut values: Vec<Option<f64>> = (0..20)
            .map(|i| Some(1e306 * (1.0 + (i % 3) as f64)))
            .collect();
        values.push(Some(f64::MAX));
        let table = Table::new(vec![floats("x", &values)]).unwrap();
        let result = Worker.run_check(
            &CheckSpec::outlier_range("x", OutlierParams::default()),
            &table,
        );
        assert_eq!(result.status, CheckStatus::Failed);
        assert_eq!(result.affected_rows, vec![20]);
    }

    #[test]
    fn outlier_lower_bound_flags_low_values() {
        let table = Table::new(vec![floats(
            "x",
            &[Some(10.0), Some(11.0), Some(12.0), Some(-50.0)],
        )])
        .unwrap();
        let params = OutlierParams {
            lower: Some(0.0),
            ..OutlierParams::default()
        };
        let result = Worker.run_check(&CheckSpec::outlier_range("x", params), &table);
        assert_eq!(result.status, CheckStatus::Failed);
        assert_eq!(result.affected_rows, vec![3]);
    }

    #[test]
    fn invalid_bounds_are_error() {
        let inverted = OutlierParams {
            lower: Some(5.0),
            upper: Some(1.0),
            ..OutlierParams::default()
        };
        let nan_lower = OutlierParams {
            lower: Some(f64::NAN),
            ..OutlierParams::default()
        };
        let nan_upper = bounded(f64::NAN);

        for params in [inverted, nan_lower, nan_upper] {
            let result = Worker.run_check(
                &CheckSpec::outlier_range("amount", params.clone()),
                &Table::demo(),
            );
            assert_eq!(result.status, CheckStatus::Error, "{params:?}");
            assert!(result.metric.is_none());
            assert!(result
                .error_message
                .unwrap()
                .contains("invalid check parameters"));
        }
    }

    #[test]
    fn non_numeric_cell_in_numeric_column_is_error() {
        for dtype in [Dtype::Int, Dtype::Float] {
            let table = Table::new(vec![(
                ColumnSpec::new("x", dtype),
                vec![
                    CellValue::Float(1.0),
                    CellValue::Text("abc".into()),
                    CellValue::Float(2.0),
                ],
            )])
            .unwrap();
            let result = Worker.run_check(
                &CheckSpec::outlier_range("x", OutlierParams::default()),
                &table,
            );
            assert_eq!(result.status, CheckStatus::Error, "{dtype:?}");
            let message = result.error_message.unwrap();
            assert!(message.contains("invalid cell in column x at row 1"), "{message}");
        }
    }

    #[test]
    fn outlier_on_string_column_is_error() {
        let table = Table::new(vec![(
            ColumnSpec::new("name", Dtype::String),
            vec![CellValue::Text("a".into())],
        )])
        .unwrap();
        let result = Worker.run_check(
            &CheckSpec::outlier_range("name", OutlierParams::default()),
            &table,
        );
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.error_message.unwrap().contains("dtype string"));
        assert!(result.metric.is_none());
    }

    #[test]
    fn invalid_threshold_is_error() {
        for threshold in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = Worker.run_check(
                &CheckSpec::outlier_range(
                    "amount",
                    OutlierParams {
                        threshold,
                        ..OutlierParams::default()
                    },
                ),
                &Table::demo(),
            );
            assert_eq!(result.status, CheckStatus::Error, "threshold {threshold}");
        }
    }

    #[test]
    fn unknown_column_is_error() {
        let result = Worker.run_check(&CheckSpec::duplicate_id("nope"), &Table::demo());
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.error_message.unwrap().contains("nope"));
    }

    #[test]
    fn empty_targets_is_error() {
        let result = Worker.run_check(&CheckSpec::missing_values(vec![]), &Table::demo());
        assert_eq!(result.status, CheckStatus::Error);
        assert!(!result.error_message.unwrap().is_empty());
    }
}
