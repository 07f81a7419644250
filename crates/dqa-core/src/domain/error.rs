//! Error taxonomy for the audit pipeline.

use crate::domain::dataset::DatasetError;
use crate::domain::report::Report;
use crate::domain::session::SessionId;
use crate::store::StorageError;

/// Reasons the planner refuses a dataset schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMetadataError {
    #[error("dataset has no columns")]
    NoColumns,

    #[error("duplicate column name: {name}")]
    DuplicateColumn { name: String },
}

/// Failures inside a single check. Never escapes the worker: it is folded
/// into a `CheckResult` with status `error`.
#[derive(Debug, thiserror::Error)]
pub enum CheckExecutionError {
    #[error("check has no target columns")]
    NoTargetColumns,

    #[error("column {column} not found in dataset")]
    UnknownColumn { column: String },

    #[error("column {column} has dtype {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        actual: String,
        expected: String,
    },

    #[error("invalid check parameters: {0}")]
    InvalidParams(String),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Fatal session outcomes surfaced to the orchestrator's caller.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// PLAN rejected the schema; nothing was executed or persisted.
    #[error("session {session_id}: invalid dataset metadata: {source}")]
    InvalidMetadata {
        session_id: SessionId,
        #[source]
        source: InvalidMetadataError,
    },

    /// The dataset could not describe itself; nothing was executed or persisted.
    #[error("session {session_id}: dataset unavailable: {source}")]
    Dataset {
        session_id: SessionId,
        #[source]
        source: DatasetError,
    },

    /// The audit ran to completion but its record could not be saved.
    #[error("session {session_id}: audit completed but was not persisted: {source}")]
    Persistence {
        session_id: SessionId,
        report: Box<Report>,
        #[source]
        source: StorageError,
    },
}

impl AuditError {
    pub fn session_id(&self) -> &SessionId {
        match self {
            AuditError::InvalidMetadata { session_id, .. }
            | AuditError::Dataset { session_id, .. }
            | AuditError::Persistence { session_id, .. } => session_id,
        }
    }

    /// The computed report, when the failure happened after evaluation.
    pub fn report(&self) -> Option<&Report> {
        match self {
            AuditError::Persistence { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Result type for audit orchestration.
pub type Result<T> = std::result::Result<T, AuditError>;
