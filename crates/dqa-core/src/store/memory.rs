//! In-memory session store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ensure_matching_id, SessionStore, StorageError, StorageResult};
use crate::domain::session::{SessionId, SessionRecord};

/// Session store backed by a `HashMap<SessionId, SessionRecord>`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StorageError {
        StorageError::Backend("session map lock poisoned".to_string())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session_id: &SessionId, record: &SessionRecord) -> StorageResult<()> {
        ensure_matching_id(session_id, record)?;
        let mut sessions = self.sessions.lock().map_err(|_| Self::poisoned())?;
        if sessions.contains_key(session_id) {
            return Err(StorageError::AlreadyExists {
                session_id: session_id.to_string(),
            });
        }
        sessions.insert(session_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        let sessions = self.sessions.lock().map_err(|_| Self::poisoned())?;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                session_id: session_id.to_string(),
            })
    }

    async fn list(&self) -> StorageResult<Vec<SessionId>> {
        let sessions = self.sessions.lock().map_err(|_| Self::poisoned())?;
        let mut ids: Vec<SessionId> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
