//! End-to-end audit sessions over in-memory stores and event logs.

use std::sync::Arc;

use async_trait::async_trait;
use dqa_core::{
    AuditConfig, AuditError, CellValue, CheckName, CheckStatus, ColumnSpec, Component,
    DatasetError, DatasetHandle, DatasetMetadata, Dtype, EventType, ExecutionMode,
    MemoryEventLog, MemorySessionStore, Metric, Observability, Orchestrator, Planner, SessionId,
    SessionRecord, SessionStore, StorageError, StorageResult, Table,
};

fn orchestrator(
    store: Arc<dyn SessionStore>,
    events: Arc<MemoryEventLog>,
    execution: ExecutionMode,
) -> Orchestrator {
    Orchestrator::new(
        Planner::new(AuditConfig::demo().planner),
        store,
        Observability::new().with_sink(events),
    )
    .with_execution(execution)
}

/// Rejects every save.
struct ReadOnlyStore;

#[async_trait]
impl SessionStore for ReadOnlyStore {
    async fn save(&self, _session_id: &SessionId, _record: &SessionRecord) -> StorageResult<()> {
        Err(StorageError::Backend("read-only".to_string()))
    }

    async fn load(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        Err(StorageError::NotFound {
            session_id: session_id.to_string(),
        })
    }

    async fn list(&self) -> StorageResult<Vec<SessionId>> {
        Ok(Vec::new())
    }
}

/// Reports a schema with a repeated column name.
struct DuplicateSchema(Table);

impl DatasetHandle for DuplicateSchema {
    fn metadata(&self) -> Result<DatasetMetadata, DatasetError> {
        Ok(DatasetMetadata::new(
            4,
            vec![
                ColumnSpec::new("id", Dtype::Int),
                ColumnSpec::new("id", Dtype::Int),
            ],
        ))
    }

    fn column(&self, name: &str) -> Result<&[CellValue], DatasetError> {
        self.0.column(name)
    }
}

/// Panics when the `amount` column is read.
struct ExplodingAmount(Table);

impl DatasetHandle for ExplodingAmount {
    fn metadata(&self) -> Result<DatasetMetadata, DatasetError> {
        self.0.metadata()
    }

    fn column(&self, name: &str) -> Result<&[CellValue], DatasetError> {
        if name == "amount" {
            panic!("amount column corrupted");
        }
        self.0.column(name)
    }
}

#[tokio::test]
async fn test_demo_dataset_fails_every_check() {
    let store = Arc::new(MemorySessionStore::new());
    let events = Arc::new(MemoryEventLog::new());
    let orch = orchestrator(store.clone(), events.clone(), ExecutionMode::Sequential);

    let response = orch
        .run_session("Please audit the transactions table", Arc::new(Table::demo()))
        .await
        .unwrap();

    let report = &response.report;
    assert_eq!(report.global_score, 0.0);
    assert_eq!(response.response, "Audit complete. Global score: 0.00");

    let checks: Vec<(CheckName, &[String])> = report
        .per_check
        .iter()
        .map(|r| (r.check, r.target_columns.as_slice()))
        .collect();
    assert_eq!(
        checks,
        vec![
            (
                CheckName::MissingValues,
                &["id".to_string(), "amount".to_string()][..]
            ),
            (CheckName::DuplicateId, &["id".to_string()][..]),
            (CheckName::OutlierRange, &["amount".to_string()][..]),
        ]
    );
    assert!(report
        .per_check
        .iter()
        .all(|r| r.status == CheckStatus::Failed));

    assert_eq!(report.per_check[0].affected_rows, vec![1]);
    assert_eq!(report.per_check[1].affected_rows, vec![1, 2]);
    assert_eq!(report.per_check[1].metric, Some(Metric::Count(1)));
    assert_eq!(report.per_check[2].affected_rows, vec![2]);
    assert_eq!(report.summary.failed, 3);
}

#[tokio::test]
async fn test_session_record_is_persisted() {
    let store = Arc::new(MemorySessionStore::new());
    let events = Arc::new(MemoryEventLog::new());
    let orch = orchestrator(store.clone(), events, ExecutionMode::Sequential);

    let response = orch
        .run_session("audit", Arc::new(Table::demo()))
        .await
        .unwrap();

    let record = store.load(&response.session_id).await.unwrap();
    assert_eq!(record.session_id, response.session_id);
    assert_eq!(record.input, "audit");
    assert_eq!(record.plan.len(), 3);
    assert_eq!(record.worker_results, response.report.per_check);
    assert_eq!(record.report, response.report);
    assert_eq!(record.metadata, Table::demo().metadata().unwrap());
}

#[tokio::test]
async fn test_event_sequence_for_successful_session() {
    let events = Arc::new(MemoryEventLog::new());
    let orch = orchestrator(
        Arc::new(MemorySessionStore::new()),
        events.clone(),
        ExecutionMode::Sequential,
    );

    let response = orch
        .run_session("audit", Arc::new(Table::demo()))
        .await
        .unwrap();
    let log = events.events_for(&response.session_id);

    let types: Vec<EventType> = log.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::Start,
            EventType::PlanCreated,
            EventType::WorkerStarted,
            EventType::WorkerFinished,
            EventType::WorkerStarted,
            EventType::WorkerFinished,
            EventType::WorkerStarted,
            EventType::WorkerFinished,
            EventType::EvalStart,
            EventType::Persisted,
            EventType::Complete,
        ]
    );

    assert_eq!(log[0].component, Component::Orchestrator);
    assert_eq!(log[0].message, "Received input: audit");
    assert_eq!(log[1].component, Component::Planner);
    let plan_details = log[1].details.as_ref().unwrap();
    assert!(plan_details["plan_id"].is_string());
    assert_eq!(plan_details["checks"], 3);

    let started: Vec<&str> = log
        .iter()
        .filter(|e| e.event_type == EventType::WorkerStarted)
        .map(|e| e.details.as_ref().unwrap()["check"].as_str().unwrap())
        .collect();
    assert_eq!(started, vec!["missing_values", "duplicate_id", "outlier_range"]);

    let complete = log.last().unwrap();
    assert_eq!(complete.details.as_ref().unwrap()["global_score"], 0.0);
    assert!(log.iter().all(|e| e.session_id == response.session_id));
}

#[tokio::test]
async fn test_invalid_metadata_aborts_without_persisting() {
    let store = Arc::new(MemorySessionStore::new());
    let events = Arc::new(MemoryEventLog::new());
    let orch = orchestrator(store.clone(), events.clone(), ExecutionMode::Sequential);

    let err = orch
        .run_session("audit", Arc::new(DuplicateSchema(Table::demo())))
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::InvalidMetadata { .. }));
    assert!(err.report().is_none());
    assert!(store.list().await.unwrap().is_empty());

    let log = events.events_for(err.session_id());
    let types: Vec<EventType> = log.iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![EventType::Start, EventType::Error]);
    assert_eq!(log[1].component, Component::Planner);
    assert!(log[1].message.contains("duplicate column name: id"));
}

#[tokio::test]
async fn test_persistence_failure_is_distinct_from_success() {
    let events = Arc::new(MemoryEventLog::new());
    let orch = orchestrator(
        Arc::new(ReadOnlyStore),
        events.clone(),
        ExecutionMode::Sequential,
    );

    let err = orch
        .run_session("audit", Arc::new(Table::demo()))
        .await
        .unwrap_err();

    let AuditError::Persistence { report, source, .. } = &err else {
        panic!("expected persistence error, got {err:?}");
    };
    assert_eq!(report.global_score, 0.0);
    assert_eq!(report.per_check.len(), 3);
    assert!(matches!(source, StorageError::Backend(_)));

    let types: Vec<EventType> = events
        .events_for(err.session_id())
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types.last(), Some(&EventType::Error));
    assert!(!types.contains(&EventType::Complete));
    assert!(!types.contains(&EventType::Persisted));
}

#[tokio::test]
async fn test_parallel_execution_keeps_plan_order() {
    let sequential = orchestrator(
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryEventLog::new()),
        ExecutionMode::Sequential,
    )
    .run_session("audit", Arc::new(Table::demo()))
    .await
    .unwrap();

    let events = Arc::new(MemoryEventLog::new());
    let parallel = orchestrator(
        Arc::new(MemorySessionStore::new()),
        events.clone(),
        ExecutionMode::Parallel { max_concurrent: 3 },
    )
    .run_session("audit", Arc::new(Table::demo()))
    .await
    .unwrap();

    assert_eq!(parallel.report.per_check, sequential.report.per_check);
    assert_eq!(parallel.report.global_score, sequential.report.global_score);

    let mut indices: Vec<u64> = events
        .events_for(&parallel.session_id)
        .iter()
        .filter(|e| e.event_type == EventType::WorkerStarted)
        .map(|e| e.details.as_ref().unwrap()["index"].as_u64().unwrap())
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_panicking_check_becomes_error_result() {
    let orch = orchestrator(
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryEventLog::new()),
        ExecutionMode::Parallel { max_concurrent: 2 },
    );

    let response = orch
        .run_session("audit", Arc::new(ExplodingAmount(Table::demo())))
        .await
        .unwrap();

    let statuses: Vec<CheckStatus> = response.report.per_check.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![CheckStatus::Error, CheckStatus::Failed, CheckStatus::Error]
    );
    assert!(response.report.per_check[0]
        .error_message
        .as_deref()
        .is_some_and(|m| !m.is_empty()));
    assert_eq!(response.report.global_score, 0.0);
    assert_eq!(response.report.summary.errored, 2);
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let store = Arc::new(MemorySessionStore::new());
    let events = Arc::new(MemoryEventLog::new());
    let orch = Arc::new(orchestrator(
        store.clone(),
        events.clone(),
        ExecutionMode::Sequential,
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let orch = Arc::clone(&orch);
        handles.push(tokio::spawn(async move {
            orch.run_session(&format!("request {i}"), Arc::new(Table::demo()))
                .await
                .unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().session_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(store.list().await.unwrap(), ids);

    for id in &ids {
        assert_eq!(events.events_for(id).len(), 11);
    }
    assert_eq!(events.len(), 88);
}

#[tokio::test]
async fn test_clean_dataset_scores_one() {
    let table = Table::new(vec![
        (
            ColumnSpec::new("customer_id", Dtype::String),
            vec![
                CellValue::Text("a".into()),
                CellValue::Text("b".into()),
                CellValue::Text("c".into()),
            ],
        ),
        (
            ColumnSpec::new("amount", Dtype::Float),
            vec![
                CellValue::Float(10.0),
                CellValue::Float(11.0),
                CellValue::Float(12.0),
            ],
        ),
    ])
    .unwrap();

    let orch = orchestrator(
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryEventLog::new()),
        ExecutionMode::Sequential,
    );
    let response = orch.run_session("audit", Arc::new(table)).await.unwrap();

    assert_eq!(response.report.global_score, 1.0);
    assert_eq!(response.response, "Audit complete. Global score: 1.00");
}
