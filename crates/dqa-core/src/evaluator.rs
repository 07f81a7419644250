//! Report aggregation.
//!
//! The global score is the pass rate over all check results. A check that
//! errored counts as not passed, and an empty result set scores 1.0.

use crate::domain::check::{CheckResult, CheckStatus};
use crate::domain::report::{Report, ReportSummary};
use crate::domain::session::SessionId;

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate `results` into a report. `per_check` keeps the input order.
    pub fn evaluate(&self, session_id: &SessionId, results: &[CheckResult]) -> Report {
        let summary = summarize(results);
        Report {
            session_id: session_id.clone(),
            per_check: results.to_vec(),
            global_score: pass_rate(&summary),
            summary,
        }
    }
}

fn summarize(results: &[CheckResult]) -> ReportSummary {
    let mut summary = ReportSummary {
        total: results.len(),
        ..ReportSummary::default()
    };
    for result in results {
        match result.status {
            CheckStatus::Passed => summary.passed += 1,
            CheckStatus::Failed => summary.failed += 1,
            CheckStatus::Error => summary.errored += 1,
        }
    }
    summary
}

fn pass_rate(summary: &ReportSummary) -> f64 {
    if summary.total == 0 {
        1.0
    } else {
        summary.passed as f64 / summary.total as f64
    }
}
