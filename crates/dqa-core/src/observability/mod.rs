//! Session-correlated event log.
//!
//! Every stage of a session reports through [`Observability::log_event`]. The
//! call never fails: each event is mirrored to `tracing` and fanned out to the
//! configured [`EventSink`]s, and a sink that errors is reported at `warn`
//! and otherwise ignored.

pub mod jsonl;
pub mod memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::session::SessionId;

pub use jsonl::JsonlEventLog;
pub use memory::MemoryEventLog;

/// Pipeline component that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Orchestrator,
    Planner,
    Worker,
    Evaluator,
    SessionStore,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Component::Orchestrator => "orchestrator",
            Component::Planner => "planner",
            Component::Worker => "worker",
            Component::Evaluator => "evaluator",
            Component::SessionStore => "session_store",
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Start,
    PlanCreated,
    WorkerStarted,
    WorkerFinished,
    EvalStart,
    Persisted,
    Complete,
    Error,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Start => "start",
            EventType::PlanCreated => "plan_created",
            EventType::WorkerStarted => "worker_started",
            EventType::WorkerFinished => "worker_finished",
            EventType::EvalStart => "eval_start",
            EventType::Persisted => "persisted",
            EventType::Complete => "complete",
            EventType::Error => "error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the event log. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    pub session_id: SessionId,
    pub component: Component,
    pub event_type: EventType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Errors an event sink may report. These never reach pipeline callers.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("event sink lock poisoned")]
    Poisoned,
}

/// Destination for observability events.
///
/// Implementations serialize their own writes; one sink is shared by every
/// concurrently running session.
pub trait EventSink: Send + Sync {
    fn append(&self, event: &ObservabilityEvent) -> std::result::Result<(), SinkError>;
}

/// Fan-out front end used by the pipeline stages.
#[derive(Clone, Default)]
pub struct Observability {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Observability {
    /// An event log that only mirrors to `tracing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Record one event. Fire-and-forget.
    pub fn log_event(
        &self,
        session_id: &SessionId,
        component: Component,
        event_type: EventType,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let event = ObservabilityEvent {
            session_id: session_id.clone(),
            component,
            event_type,
            message: message.into(),
            details,
            timestamp: Utc::now(),
        };

        crate::obs::emit_event_logged(&event);

        for sink in &self.sinks {
            if let Err(e) = sink.append(&event) {
                crate::obs::emit_sink_error(session_id.as_str(), event_type.as_str(), &e);
            }
        }
    }
}
