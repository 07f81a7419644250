//! Session persistence.
//!
//! `SessionStore` is the key-value abstraction the orchestrator writes
//! finished sessions to:
//! - `MemorySessionStore`: process-local, used by tests and the demo service
//! - `FsSessionStore`: one JSON document per session with a SHA-256 sidecar
//!
//! Records are write-once. A second `save` for the same id is rejected so the
//! stored audit trail can never be rewritten.

pub mod fs;
pub mod memory;

use async_trait::async_trait;

use crate::domain::session::{SessionId, SessionRecord};

pub use fs::FsSessionStore;
pub use memory::MemorySessionStore;

/// Errors from session stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("session already persisted: {session_id}")]
    AlreadyExists { session_id: String },

    #[error("invalid session id: {session_id:?}")]
    InvalidId { session_id: String },

    #[error("record for session {record} saved under key {key}")]
    IdMismatch { key: String, record: String },

    #[error("digest mismatch for session {session_id}: expected {expected}, got {actual}")]
    DigestMismatch {
        session_id: String,
        expected: String,
        actual: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable home for finished sessions.
///
/// Guarantees:
/// - `save` is visible to a subsequent `load` of the same id in this process.
/// - A session id is written at most once.
/// - Concurrent sessions may save simultaneously.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist `record` under `session_id`. Fails with `AlreadyExists` if the
    /// id was saved before and `IdMismatch` if the record carries another id.
    async fn save(&self, session_id: &SessionId, record: &SessionRecord) -> StorageResult<()>;

    /// Retrieve a record. Returns `StorageError::NotFound` if absent.
    async fn load(&self, session_id: &SessionId) -> StorageResult<SessionRecord>;

    /// All stored session ids, sorted.
    async fn list(&self) -> StorageResult<Vec<SessionId>>;
}

pub(crate) fn ensure_matching_id(key: &SessionId, record: &SessionRecord) -> StorageResult<()> {
    if key != &record.session_id {
        return Err(StorageError::IdMismatch {
            key: key.to_string(),
            record: record.session_id.to_string(),
        });
    }
    Ok(())
}
