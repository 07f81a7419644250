//! Tabular dataset model: schema metadata, typed cells and the
//! [`DatasetHandle`] abstraction the pipeline reads through.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int,
    Float,
    String,
    Bool,
    Datetime,
}

impl Dtype {
    /// Whether values of this type support mean/stddev statistics.
    pub fn is_numeric(self) -> bool {
        matches!(self, Dtype::Int | Dtype::Float)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dtype::Int => "int",
            Dtype::Float => "float",
            Dtype::String => "string",
            Dtype::Bool => "bool",
            Dtype::Datetime => "datetime",
        }
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and type of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: Dtype,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, dtype: Dtype) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Schema-level description of a dataset, the only input the planner sees.
///
/// Column names are expected to be unique; the planner rejects metadata
/// that violates this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub row_count: u64,
    pub columns: Vec<ColumnSpec>,
}

impl DatasetMetadata {
    pub fn new(row_count: u64, columns: Vec<ColumnSpec>) -> Self {
        Self { row_count, columns }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Datetime(DateTime<Utc>),
}

impl CellValue {
    /// Null cells and NaN floats are treated as absent.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the cell, `None` for missing or non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Hashable, totally ordered key used to group equal values.
    ///
    /// Missing cells have no key.
    pub fn group_key(&self) -> Option<GroupKey> {
        match self {
            CellValue::Null => None,
            CellValue::Int(v) => Some(GroupKey::Int(*v)),
            CellValue::Float(v) if v.is_nan() => None,
            // -0.0 and 0.0 compare equal, so they must share a key
            CellValue::Float(v) if *v == 0.0 => Some(GroupKey::Float(0.0f64.to_bits())),
            CellValue::Float(v) => Some(GroupKey::Float(v.to_bits())),
            CellValue::Text(v) => Some(GroupKey::Text(v.clone())),
            CellValue::Bool(v) => Some(GroupKey::Bool(*v)),
            CellValue::Datetime(v) => Some(GroupKey::Datetime(*v)),
        }
    }

    /// Convert a JSON value into a cell of the declared column type.
    pub fn from_json(
        value: &serde_json::Value,
        dtype: Dtype,
    ) -> std::result::Result<Self, String> {
        use serde_json::Value;

        match (dtype, value) {
            (_, Value::Null) => Ok(CellValue::Null),
            (Dtype::Int, Value::Number(n)) => n
                .as_i64()
                .map(CellValue::Int)
                .ok_or_else(|| format!("{n} is not a 64-bit integer")),
            (Dtype::Float, Value::Number(n)) => n
                .as_f64()
                .map(CellValue::Float)
                .ok_or_else(|| format!("{n} is not representable as f64")),
            (Dtype::String, Value::String(s)) => Ok(CellValue::Text(s.clone())),
            (Dtype::Bool, Value::Bool(b)) => Ok(CellValue::Bool(*b)),
            (Dtype::Datetime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| CellValue::Datetime(dt.with_timezone(&Utc)))
                .map_err(|e| format!("'{s}' is not an RFC 3339 timestamp: {e}")),
            (dtype, other) => Err(format!("expected {dtype} value, got {other}")),
        }
    }
}

/// Grouping key derived from a non-missing [`CellValue`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
    Datetime(DateTime<Utc>),
}

/// Errors raised while materializing or reading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("unknown column: {name}")]
    UnknownColumn { name: String },

    #[error("duplicate column: {name}")]
    DuplicateColumn { name: String },

    #[error("column {name} has {actual} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} out of range (row count {row_count})")]
    RowOutOfRange { row: usize, row_count: usize },

    #[error("invalid cell in column {column} at row {row}: {reason}")]
    InvalidCell {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("dataset unavailable: {0}")]
    Unavailable(String),

    #[error("dataset document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only access to an already-materialized dataset.
///
/// Implementations must be shareable across threads: the executor may run
/// several checks against the same handle concurrently.
pub trait DatasetHandle: Send + Sync {
    /// Schema and row count.
    fn metadata(&self) -> std::result::Result<DatasetMetadata, DatasetError>;

    /// All cells of a column, in row order.
    fn column(&self, name: &str) -> std::result::Result<&[CellValue], DatasetError>;

    /// A single cell by row index and column name.
    fn cell(&self, row: usize, name: &str) -> std::result::Result<&CellValue, DatasetError> {
        let cells = self.column(name)?;
        cells.get(row).ok_or(DatasetError::RowOutOfRange {
            row,
            row_count: cells.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    spec: ColumnSpec,
    cells: Vec<CellValue>,
}

/// Column-oriented in-memory table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

/// On-disk JSON shape accepted by [`Table::from_json_str`].
///
/// ```json
/// {"columns": [{"name": "id", "dtype": "int", "values": [1, 2, null]}]}
/// ```
#[derive(Debug, Deserialize)]
struct TableDocument {
    columns: Vec<ColumnDocument>,
}

#[derive(Debug, Deserialize)]
struct ColumnDocument {
    name: String,
    dtype: Dtype,
    values: Vec<serde_json::Value>,
}

impl Table {
    /// Build a table from typed columns. All columns must have the same length
    /// and distinct names.
    pub fn new(
        columns: Vec<(ColumnSpec, Vec<CellValue>)>,
    ) -> std::result::Result<Self, DatasetError> {
        let row_count = columns.first().map(|(_, cells)| cells.len()).unwrap_or(0);
        let mut built: Vec<Column> = Vec::with_capacity(columns.len());

        for (spec, cells) in columns {
            if built.iter().any(|c| c.spec.name == spec.name) {
                return Err(DatasetError::DuplicateColumn { name: spec.name });
            }
            if cells.len() != row_count {
                return Err(DatasetError::RaggedColumn {
                    name: spec.name,
                    expected: row_count,
                    actual: cells.len(),
                });
            }
            built.push(Column { spec, cells });
        }

        Ok(Self {
            columns: built,
            row_count,
        })
    }

    /// Parse a JSON table document.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, DatasetError> {
        let doc: TableDocument = serde_json::from_str(json)?;
        let mut columns = Vec::with_capacity(doc.columns.len());

        for col in doc.columns {
            let cells = col
                .values
                .iter()
                .enumerate()
                .map(|(row, v)| {
                    CellValue::from_json(v, col.dtype).map_err(|reason| DatasetError::InvalidCell {
                        column: col.name.clone(),
                        row,
                        reason,
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            columns.push((ColumnSpec::new(col.name, col.dtype), cells));
        }

        Self::new(columns)
    }

    /// Read and parse a JSON table document from disk.
    pub fn from_path(path: &Path) -> std::result::Result<Self, DatasetError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The built-in demonstration dataset: a duplicated id, a missing amount
    /// and one amount far above the rest.
    pub fn demo() -> Self {
        Self {
            columns: vec![
                Column {
                    spec: ColumnSpec::new("id", Dtype::Int),
                    cells: vec![
                        CellValue::Int(1),
                        CellValue::Int(2),
                        CellValue::Int(2),
                        CellValue::Int(3),
                    ],
                },
                Column {
                    spec: ColumnSpec::new("amount", Dtype::Float),
                    cells: vec![
                        CellValue::Float(10.0),
                        CellValue::Null,
                        CellValue::Float(2000.0),
                        CellValue::Float(15.0),
                    ],
                },
            ],
            row_count: 4,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

impl DatasetHandle for Table {
    fn metadata(&self) -> std::result::Result<DatasetMetadata, DatasetError> {
        Ok(DatasetMetadata {
            row_count: self.row_count as u64,
            columns: self.columns.iter().map(|c| c.spec.clone()).collect(),
        })
    }

    fn column(&self, name: &str) -> std::result::Result<&[CellValue], DatasetError> {
        self.columns
            .iter()
            .find(|c| c.spec.name == name)
            .map(|c| c.cells.as_slice())
            .ok_or_else(|| DatasetError::UnknownColumn {
                name: name.to_string(),
            })
    }
}
