//! Entry point that wires configuration into a ready-to-serve orchestrator.

use std::sync::Arc;

use crate::config::{AuditConfig, StorageConfig};
use crate::domain::dataset::{DatasetHandle, Table};
use crate::domain::error::Result;
use crate::observability::{JsonlEventLog, Observability, SinkError};
use crate::orchestrator::{AuditResponse, Orchestrator};
use crate::planner::Planner;
use crate::store::{FsSessionStore, MemorySessionStore, SessionStore, StorageError};

/// Failures while assembling a service from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("session store: {0}")]
    Store(#[from] StorageError),

    #[error("event log: {0}")]
    EventLog(#[from] SinkError),
}

/// An orchestrator bound to one dataset.
pub struct AuditService {
    orchestrator: Orchestrator,
    dataset: Arc<dyn DatasetHandle>,
}

impl AuditService {
    pub fn new(orchestrator: Orchestrator, dataset: Arc<dyn DatasetHandle>) -> Self {
        Self {
            orchestrator,
            dataset,
        }
    }

    /// Build the store, event sinks and planner described by `config`.
    pub fn from_config(
        config: &AuditConfig,
        dataset: Arc<dyn DatasetHandle>,
    ) -> std::result::Result<Self, ServiceError> {
        let store: Arc<dyn SessionStore> = match &config.storage {
            StorageConfig::Memory => Arc::new(MemorySessionStore::new()),
            StorageConfig::Fs { root } => Arc::new(FsSessionStore::new(root)?),
        };

        let mut observability = Observability::new();
        if let Some(path) = &config.events_path {
            observability = observability.with_sink(Arc::new(JsonlEventLog::open(path)?));
        }

        let orchestrator = Orchestrator::new(
            Planner::new(config.planner.clone()),
            store,
            observability,
        )
        .with_execution(config.execution);

        tracing::debug!(
            storage = ?config.storage,
            events_path = ?config.events_path,
            execution = ?config.execution,
            "audit service configured"
        );

        Ok(Self::new(orchestrator, dataset))
    }

    /// In-memory service over the built-in demo table.
    pub fn demo() -> Self {
        let config = AuditConfig::demo();
        let orchestrator = Orchestrator::new(
            Planner::new(config.planner),
            Arc::new(MemorySessionStore::new()),
            Observability::new(),
        );
        Self::new(orchestrator, Arc::new(Table::demo()))
    }

    /// Run one audit session for a free-text request.
    pub async fn serve_text_input(&self, text: &str) -> Result<AuditResponse> {
        self.orchestrator
            .run_session(text, Arc::clone(&self.dataset))
            .await
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.orchestrator.store()
    }
}

/// Audit the built-in demo dataset with an in-memory service.
pub async fn serve_text_input(text: &str) -> Result<AuditResponse> {
    AuditService::demo().serve_text_input(text).await
}
