//! Structured tracing hooks for the audit session lifecycle.
//!
//! This module provides:
//! - A session-scoped span via [`session_span`]
//! - Emission functions for key lifecycle events: start, plan, per-check
//!   outcome, scoring and failure
//!
//! Events are emitted at `info!` level (configurable via `RUST_LOG`).
//! For JSON output, pass `--json` to the CLI.

use tracing::{debug, info, warn};

use crate::observability::ObservabilityEvent;

/// Span tagged with the session id. Attach it to a session's future with
/// `tracing::Instrument` so every log line inside carries the id.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("dqa.session", session_id = %session_id)
}

/// Emit event: session started.
pub fn emit_session_started(session_id: &str, input_len: usize) {
    info!(event = "session.started", session_id = %session_id, input_len = input_len);
}

/// Emit event: plan created.
pub fn emit_plan_created(session_id: &str, plan_id: &str, checks: usize) {
    info!(
        event = "plan.created",
        session_id = %session_id,
        plan_id = %plan_id,
        checks = checks,
    );
}

/// Emit event: one check finished.
pub fn emit_check_finished(session_id: &str, index: usize, check: &str, status: &str) {
    info!(
        event = "check.finished",
        session_id = %session_id,
        index = index,
        check = %check,
        status = %status,
    );
}

/// Emit event: session scored and persisted.
pub fn emit_session_scored(session_id: &str, global_score: f64, checks: usize, duration_ms: u64) {
    info!(
        event = "session.scored",
        session_id = %session_id,
        global_score = global_score,
        checks = checks,
        duration_ms = duration_ms,
    );
}

/// Emit event: session aborted (warning level).
pub fn emit_session_failed(session_id: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "session.failed", session_id = %session_id, stage = %stage, error = %error);
}

/// Mirror of every event-log entry at `debug!` level.
pub fn emit_event_logged(event: &ObservabilityEvent) {
    debug!(
        event = "eventlog.appended",
        session_id = %event.session_id,
        component = %event.component,
        event_type = %event.event_type,
        message = %event.message,
    );
}

/// Emit event: an event sink rejected an entry (warning level).
pub fn emit_sink_error(session_id: &str, event_type: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "eventlog.sink_error",
        session_id = %session_id,
        event_type = %event_type,
        error = %error,
    );
}
