//! Domain models for dq-audit.
//!
//! Canonical definitions for the core entities:
//! - `DatasetMetadata` / `DatasetHandle`: what is audited
//! - `CheckSpec` / `CheckResult`: one rule and its outcome
//! - `Plan`: ordered checks for a schema
//! - `Report`: aggregated outcome with a global score
//! - `SessionRecord`: the persisted audit trail of one session

pub mod check;
pub mod dataset;
pub mod error;
pub mod plan;
pub mod report;
pub mod session;

pub use check::{
    CheckKind, CheckName, CheckResult, CheckSpec, CheckStatus, Metric, OutlierParams,
    DEFAULT_OUTLIER_THRESHOLD,
};
pub use dataset::{
    CellValue, ColumnSpec, DatasetError, DatasetHandle, DatasetMetadata, Dtype, GroupKey, Table,
};
pub use error::{AuditError, CheckExecutionError, InvalidMetadataError, Result};
pub use plan::{Plan, PlanId};
pub use report::{Report, ReportSummary};
pub use session::{SessionId, SessionRecord};
