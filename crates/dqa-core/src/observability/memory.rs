//! In-memory event sink.

use std::sync::{Mutex, PoisonError};

use super::{EventSink, ObservabilityEvent, SinkError};
use crate::domain::session::SessionId;

/// Event sink that keeps every event in insertion order.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<ObservabilityEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events.
    pub fn events(&self) -> Vec<ObservabilityEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events belonging to one session, in the order they were appended.
    pub fn events_for(&self, session_id: &SessionId) -> Vec<ObservabilityEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| &e.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemoryEventLog {
    fn append(&self, event: &ObservabilityEvent) -> std::result::Result<(), SinkError> {
        let mut events = self.events.lock().map_err(|_| SinkError::Poisoned)?;
        events.push(event.clone());
        Ok(())
    }
}
