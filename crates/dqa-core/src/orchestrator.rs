//! Session state machine.
//!
//! ```text
//! START -> PLAN -> EXECUTE(1..N) -> EVALUATE -> PERSIST -> DONE
//! ```
//!
//! Each [`Orchestrator::run_session`] call is one single-shot session with its
//! own [`SessionId`]. Sessions share nothing except the store and the event
//! sinks, so many can run concurrently against one orchestrator.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::ExecutionMode;
use crate::domain::check::{CheckResult, CheckSpec, CheckStatus};
use crate::domain::dataset::DatasetHandle;
use crate::domain::error::{AuditError, Result};
use crate::domain::plan::Plan;
use crate::domain::report::Report;
use crate::domain::session::{SessionId, SessionRecord};
use crate::evaluator::Evaluator;
use crate::metrics::METRICS;
use crate::obs;
use crate::observability::{Component, EventType, Observability};
use crate::planner::Planner;
use crate::store::SessionStore;
use crate::worker::Worker;

/// What a finished session returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResponse {
    pub session_id: SessionId,
    /// Human-readable one-line summary.
    pub response: String,
    pub report: Report,
}

impl AuditResponse {
    fn new(report: Report) -> Self {
        Self {
            session_id: report.session_id.clone(),
            response: format!("Audit complete. Global score: {:.2}", report.global_score),
            report,
        }
    }
}

/// Drives one audit session through every stage.
pub struct Orchestrator {
    planner: Planner,
    worker: Worker,
    evaluator: Evaluator,
    store: Arc<dyn SessionStore>,
    observability: Observability,
    execution: ExecutionMode,
}

impl Orchestrator {
    pub fn new(planner: Planner, store: Arc<dyn SessionStore>, observability: Observability) -> Self {
        Self {
            planner,
            worker: Worker::new(),
            evaluator: Evaluator::new(),
            store,
            observability,
            execution: ExecutionMode::default(),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Audit `dataset` on behalf of the request text `input`.
    pub async fn run_session(
        &self,
        input: &str,
        dataset: Arc<dyn DatasetHandle>,
    ) -> Result<AuditResponse> {
        let session_id = SessionId::new();
        let span = obs::session_span(session_id.as_str());
        self.run_stages(session_id, input, dataset)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        session_id: SessionId,
        input: &str,
        dataset: Arc<dyn DatasetHandle>,
    ) -> Result<AuditResponse> {
        let started = Instant::now();

        // START
        METRICS.inc_sessions_started();
        obs::emit_session_started(session_id.as_str(), input.len());
        self.observability.log_event(
            &session_id,
            Component::Orchestrator,
            EventType::Start,
            format!("Received input: {input}"),
            None,
        );

        // PLAN
        let metadata = match dataset.metadata() {
            Ok(metadata) => metadata,
            Err(source) => {
                return Err(self.fail(
                    "plan",
                    Component::Orchestrator,
                    AuditError::Dataset { session_id, source },
                ))
            }
        };
        let plan = match self.planner.make_plan(&metadata) {
            Ok(plan) => plan,
            Err(source) => {
                return Err(self.fail(
                    "plan",
                    Component::Planner,
                    AuditError::InvalidMetadata { session_id, source },
                ))
            }
        };
        obs::emit_plan_created(session_id.as_str(), &plan.plan_id.0, plan.len());
        self.observability.log_event(
            &session_id,
            Component::Planner,
            EventType::PlanCreated,
            "Plan created",
            Some(json!({
                "plan_id": plan.plan_id,
                "checks": plan.len(),
                "checks_digest": plan.checks_digest().ok(),
            })),
        );

        // EXECUTE
        let worker_results = match self.execution {
            ExecutionMode::Sequential => {
                self.execute_sequential(&session_id, &plan, dataset.as_ref())
            }
            ExecutionMode::Parallel { max_concurrent } => {
                self.execute_parallel(&session_id, &plan, dataset, max_concurrent)
                    .await
            }
        };

        // EVALUATE
        self.observability.log_event(
            &session_id,
            Component::Evaluator,
            EventType::EvalStart,
            "Evaluator starting",
            None,
        );
        let report = self.evaluator.evaluate(&session_id, &worker_results);

        // PERSIST
        let record = SessionRecord {
            session_id: session_id.clone(),
            input: input.to_string(),
            metadata,
            plan,
            worker_results,
            report: report.clone(),
            created_at: Utc::now(),
        };
        if let Err(source) = self.store.save(&session_id, &record).await {
            return Err(self.fail(
                "persist",
                Component::SessionStore,
                AuditError::Persistence {
                    session_id,
                    report: Box::new(report),
                    source,
                },
            ));
        }
        self.observability.log_event(
            &session_id,
            Component::SessionStore,
            EventType::Persisted,
            "Session record saved",
            None,
        );

        // DONE
        METRICS.inc_sessions_completed();
        obs::emit_session_scored(
            session_id.as_str(),
            report.global_score,
            report.per_check.len(),
            started.elapsed().as_millis() as u64,
        );
        self.observability.log_event(
            &session_id,
            Component::Orchestrator,
            EventType::Complete,
            "Audit complete",
            Some(json!({ "global_score": report.global_score })),
        );

        Ok(AuditResponse::new(report))
    }

    fn execute_sequential(
        &self,
        session_id: &SessionId,
        plan: &Plan,
        dataset: &dyn DatasetHandle,
    ) -> Vec<CheckResult> {
        plan.checks
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                log_worker_started(&self.observability, session_id, index, spec);
                let result = self.worker.run_check(spec, dataset);
                log_worker_finished(&self.observability, session_id, index, &result);
                result
            })
            .collect()
    }

    /// Run checks on blocking threads, at most `max_concurrent` at a time.
    /// Results come back in plan order regardless of completion order.
    async fn execute_parallel(
        &self,
        session_id: &SessionId,
        plan: &Plan,
        dataset: Arc<dyn DatasetHandle>,
        max_concurrent: usize,
    ) -> Vec<CheckResult> {
        let sem = Arc::new(Semaphore::new(max_concurrent.max(1)));

        let tasks = plan.checks.iter().enumerate().map(|(index, spec)| {
            let sem = Arc::clone(&sem);
            let dataset = Arc::clone(&dataset);
            let worker = self.worker;
            let observability = self.observability.clone();
            let session_id = session_id.clone();
            let spec = spec.clone();

            async move {
                let _permit = sem.acquire_owned().await.ok();
                log_worker_started(&observability, &session_id, index, &spec);

                let task_spec = spec.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    worker.run_check(&task_spec, dataset.as_ref())
                })
                .await;
                let result = joined
                    .unwrap_or_else(|e| CheckResult::error(&spec, format!("check aborted: {e}")));

                log_worker_finished(&observability, &session_id, index, &result);
                result
            }
        });

        join_all(tasks).await
    }

    /// Record a fatal error and hand it back for returning.
    fn fail(&self, stage: &str, component: Component, err: AuditError) -> AuditError {
        METRICS.inc_sessions_failed();
        obs::emit_session_failed(err.session_id().as_str(), stage, &err);
        self.observability.log_event(
            err.session_id(),
            component,
            EventType::Error,
            err.to_string(),
            Some(json!({ "stage": stage })),
        );
        err
    }
}

fn log_worker_started(
    observability: &Observability,
    session_id: &SessionId,
    index: usize,
    spec: &CheckSpec,
) {
    observability.log_event(
        session_id,
        Component::Worker,
        EventType::WorkerStarted,
        "Running check",
        Some(json!({
            "check": spec.name(),
            "index": index,
            "target_columns": spec.target_columns,
        })),
    );
}

fn log_worker_finished(
    observability: &Observability,
    session_id: &SessionId,
    index: usize,
    result: &CheckResult,
) {
    METRICS.record_check(result.status == CheckStatus::Error);
    obs::emit_check_finished(
        session_id.as_str(),
        index,
        result.check.as_str(),
        result.status.as_str(),
    );
    observability.log_event(
        session_id,
        Component::Worker,
        EventType::WorkerFinished,
        format!("Check {} {}", result.check, result.status),
        Some(json!({
            "check": result.check,
            "index": index,
            "status": result.status,
        })),
    );
}
