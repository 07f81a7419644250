//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables:
//!
//! | Variable                | Field                                  |
//! |-------------------------|----------------------------------------|
//! | `DQA_STORE_DIR`         | `storage = { backend = "fs", root }`   |
//! | `DQA_EVENTS_PATH`       | `events_path`                          |
//! | `DQA_OUTLIER_THRESHOLD` | `planner.outlier_threshold`            |
//! | `DQA_MAX_CONCURRENT`    | `execution = { mode = "parallel", .. }`|
//!
//! ```toml
//! events_path = ".dqa/events.jsonl"
//!
//! [planner]
//! identifier_suffixes = ["_id", "_key"]
//! outlier_threshold = 2.5
//!
//! [planner.column_bounds.amount]
//! upper = 1000.0
//!
//! [execution]
//! mode = "parallel"
//! max_concurrent = 4
//!
//! [storage]
//! backend = "fs"
//! root = ".dqa"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::check::DEFAULT_OUTLIER_THRESHOLD;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Absolute limits for one numeric column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnBounds {
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

/// Rules the planner uses to pick checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Column names treated as identifiers.
    pub identifier_names: Vec<String>,
    /// Column name suffixes treated as identifiers.
    pub identifier_suffixes: Vec<String>,
    /// z-score multiplier for `outlier_range`.
    pub outlier_threshold: f64,
    /// Absolute bounds per column name, added to `outlier_range` params.
    pub column_bounds: BTreeMap<String, ColumnBounds>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            identifier_names: vec!["id".to_string()],
            identifier_suffixes: vec!["_id".to_string()],
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            column_bounds: BTreeMap::new(),
        }
    }
}

impl PlannerConfig {
    /// Whether a column name looks like an identifier.
    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifier_names.iter().any(|n| n == name)
            || self
                .identifier_suffixes
                .iter()
                .any(|s| !s.is_empty() && name.ends_with(s.as_str()))
    }
}

/// How the EXECUTE stage schedules checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One check after another on the session's own task.
    #[default]
    Sequential,
    /// Checks run on blocking worker threads, at most `max_concurrent` at once.
    Parallel { max_concurrent: usize },
}

/// Session store backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    Fs { root: PathBuf },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON Lines event log; events only go to `tracing` when unset.
    pub events_path: Option<PathBuf>,
    pub planner: PlannerConfig,
    pub execution: ExecutionMode,
    pub storage: StorageConfig,
}

impl AuditConfig {
    /// Defaults plus the bound the built-in demo dataset is audited with:
    /// `amount` must not exceed 1000.0.
    pub fn demo() -> Self {
        let mut config = Self::default();
        config.planner.column_bounds.insert(
            "amount".to_string(),
            ColumnBounds {
                lower: None,
                upper: Some(1000.0),
            },
        );
        config
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` (defaults when `None`), then apply `DQA_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|source| ConfigError::Io {
                    path: p.to_path_buf(),
                    source,
                })?;
                toml::from_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// [`AuditConfig::load`]).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("DQA_STORE_DIR") {
            self.storage = StorageConfig::Fs {
                root: PathBuf::from(dir),
            };
        }
        if let Some(path) = lookup("DQA_EVENTS_PATH") {
            self.events_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("DQA_OUTLIER_THRESHOLD") {
            self.planner.outlier_threshold =
                raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: "DQA_OUTLIER_THRESHOLD".to_string(),
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup("DQA_MAX_CONCURRENT") {
            let max_concurrent: usize =
                raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: "DQA_MAX_CONCURRENT".to_string(),
                    value: raw.clone(),
                })?;
            self.execution = if max_concurrent <= 1 {
                ExecutionMode::Sequential
            } else {
                ExecutionMode::Parallel { max_concurrent }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.planner.outlier_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "planner.outlier_threshold must be a positive number, got {threshold}"
            )));
        }
        if let ExecutionMode::Parallel { max_concurrent: 0 } = self.execution {
            return Err(ConfigError::Invalid(
                "execution.max_concurrent must be at least 1".to_string(),
            ));
        }
        for (column, bounds) in &self.planner.column_bounds {
            if let (Some(lower), Some(upper)) = (bounds.lower, bounds.upper) {
                if lower > upper {
                    return Err(ConfigError::Invalid(format!(
                        "column_bounds.{column}: lower {lower} exceeds upper {upper}"
                    )));
                }
            }
        }
        Ok(())
    }
}
