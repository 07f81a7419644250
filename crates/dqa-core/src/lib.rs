//! dq-audit core library.
//!
//! A single-shot data-quality audit pipeline: a [`Planner`] derives checks
//! from a dataset schema, a [`Worker`] runs them, an [`Evaluator`] scores the
//! results and the [`Orchestrator`] persists the session to a
//! [`SessionStore`], reporting every step to the [`Observability`] log.

pub mod config;
pub mod domain;
pub mod evaluator;
pub mod metrics;
pub mod obs;
pub mod observability;
pub mod orchestrator;
pub mod planner;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod worker;

pub use config::{
    AuditConfig, ColumnBounds, ConfigError, ExecutionMode, PlannerConfig, StorageConfig,
};

pub use domain::{
    AuditError, CellValue, CheckExecutionError, CheckKind, CheckName, CheckResult, CheckSpec,
    CheckStatus, ColumnSpec, DatasetError, DatasetHandle, DatasetMetadata, Dtype,
    InvalidMetadataError, Metric, OutlierParams, Plan, PlanId, Report, ReportSummary, Result,
    SessionId, SessionRecord, Table,
};

pub use evaluator::Evaluator;
pub use observability::{
    Component, EventSink, EventType, JsonlEventLog, MemoryEventLog, Observability,
    ObservabilityEvent, SinkError,
};
pub use orchestrator::{AuditResponse, Orchestrator};
pub use planner::Planner;
pub use service::{serve_text_input, AuditService, ServiceError};
pub use store::{FsSessionStore, MemorySessionStore, SessionStore, StorageError, StorageResult};
pub use worker::Worker;
