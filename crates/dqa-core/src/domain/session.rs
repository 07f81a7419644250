//! Session identity and the persisted session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::check::CheckResult;
use crate::domain::dataset::DatasetMetadata;
use crate::domain::plan::Plan;
use crate::domain::report::Report;

/// Unique identifier for one audit session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random SessionId
    pub fn new() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

/// Everything one session produced. Written once to a session store and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    /// Original user text that triggered the audit.
    pub input: String,
    /// Schema of the dataset that was audited.
    pub metadata: DatasetMetadata,
    pub plan: Plan,
    pub worker_results: Vec<CheckResult>,
    pub report: Report,
    pub created_at: DateTime<Utc>,
}
