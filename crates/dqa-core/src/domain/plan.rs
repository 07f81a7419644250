//! Audit plans produced by the planner.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::check::CheckSpec;

/// Unique identifier of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

impl PlanId {
    /// Generate a new random PlanId
    pub fn new() -> Self {
        PlanId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered checks selected for one dataset schema. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: PlanId,
    pub checks: Vec<CheckSpec>,
}

impl Plan {
    pub fn new(checks: Vec<CheckSpec>) -> Self {
        Self {
            plan_id: PlanId::new(),
            checks,
        }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// SHA-256 hex over the JSON encoding of `checks`, independent of
    /// `plan_id`.
    ///
    /// Two plans built from the same metadata and configuration share a digest.
    pub fn checks_digest(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(&self.checks)?;
        Ok(hex::encode(Sha256::digest(json)))
    }
}
