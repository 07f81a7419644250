//! Aggregated audit report.

use serde::{Deserialize, Serialize};

use crate::domain::check::CheckResult;
use crate::domain::session::SessionId;

/// Status counts over a report's results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

/// Final outcome of a session.
///
/// `global_score` is the fraction of `per_check` entries that passed, and
/// `per_check` is in plan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub session_id: SessionId,
    pub per_check: Vec<CheckResult>,
    pub global_score: f64,
    pub summary: ReportSummary,
}
