//! Check specifications and per-check results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default z-score multiplier for `outlier_range`.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// Stable identifier of a check kind, as it appears in reports and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    MissingValues,
    DuplicateId,
    OutlierRange,
}

impl CheckName {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckName::MissingValues => "missing_values",
            CheckName::DuplicateId => "duplicate_id",
            CheckName::OutlierRange => "outlier_range",
        }
    }
}

impl std::fmt::Display for CheckName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the `outlier_range` check.
///
/// A value is an outlier when it is more than `threshold` sample standard
/// deviations from the mean, or when it falls outside `[lower, upper]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierParams {
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_OUTLIER_THRESHOLD,
            lower: None,
            upper: None,
        }
    }
}

/// Kind of check with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", content = "params", rename_all = "snake_case")]
pub enum CheckKind {
    MissingValues,
    DuplicateId,
    OutlierRange(OutlierParams),
}

impl CheckKind {
    pub fn name(&self) -> CheckName {
        match self {
            CheckKind::MissingValues => CheckName::MissingValues,
            CheckKind::DuplicateId => CheckName::DuplicateId,
            CheckKind::OutlierRange(_) => CheckName::OutlierRange,
        }
    }
}

/// One planned check: what to run and which columns it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSpec {
    pub kind: CheckKind,
    pub target_columns: Vec<String>,
}

impl CheckSpec {
    pub fn missing_values(columns: Vec<String>) -> Self {
        Self {
            kind: CheckKind::MissingValues,
            target_columns: columns,
        }
    }

    pub fn duplicate_id(column: impl Into<String>) -> Self {
        Self {
            kind: CheckKind::DuplicateId,
            target_columns: vec![column.into()],
        }
    }

    pub fn outlier_range(column: impl Into<String>, params: OutlierParams) -> Self {
        Self {
            kind: CheckKind::OutlierRange(params),
            target_columns: vec![column.into()],
        }
    }

    pub fn name(&self) -> CheckName {
        self.kind.name()
    }
}

/// Outcome class of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    Error,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Passed => "passed",
            CheckStatus::Failed => "failed",
            CheckStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurement attached to a check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Count(u64),
    PerColumn(BTreeMap<String, u64>),
}

/// Result of running one [`CheckSpec`].
///
/// `error_message` is `Some` exactly when `status` is [`CheckStatus::Error`];
/// the constructors keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: CheckName,
    pub target_columns: Vec<String>,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(default)]
    pub affected_rows: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CheckResult {
    /// A completed check; fails when any row is affected.
    pub fn completed(spec: &CheckSpec, metric: Metric, affected_rows: Vec<usize>) -> Self {
        let status = if affected_rows.is_empty() {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        };
        Self {
            check: spec.name(),
            target_columns: spec.target_columns.clone(),
            status,
            metric: Some(metric),
            affected_rows,
            error_message: None,
        }
    }

    /// A check that could not run.
    pub fn error(spec: &CheckSpec, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = format!("{} could not run", spec.name());
        }
        Self {
            check: spec.name(),
            target_columns: spec.target_columns.clone(),
            status: CheckStatus::Error,
            metric: None,
            affected_rows: Vec::new(),
            error_message: Some(message),
        }
    }
}
