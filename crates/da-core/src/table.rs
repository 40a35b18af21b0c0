//! Core table types for representing decoded 2DA data

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the implicit first column holding the row ID
pub const ID_COLUMN: &str = "ID";

/// Field name the row ID is stored under
pub const ID_FIELD: &str = "id";

/// A decoded table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Column names; always starts with `ID` when non-empty
    pub columns: Vec<String>,
    /// Rows in source order
    pub rows: Vec<TableRow>,
}

impl TableData {
    /// Create an empty table (no header, no rows)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from header columns (excluding ID) and decoded rows.
    ///
    /// Prepends the `ID` column and keeps the header order as given.
    pub fn assemble(header: Vec<String>, rows: Vec<TableRow>) -> Self {
        let mut columns = Vec::with_capacity(header.len() + 1);
        columns.push(ID_COLUMN.to_string());
        columns.extend(header);
        Self { columns, rows }
    }

    /// True when there is no header and no rows
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Find a row by ID
    pub fn find_row(&self, id: i64) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.id == id)
    }
}

/// A row of data keyed by column name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Row ID (first token of the source line)
    pub id: i64,
    /// Values for the non-ID columns present on the line
    #[serde(flatten)]
    pub values: BTreeMap<String, CellValue>,
}

impl TableRow {
    /// Create a row with no values
    pub fn new(id: i64) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
        }
    }

    /// Set a column value
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.values.insert(column.into(), value);
    }

    /// Get a value by column name. `ID` and `id` yield the row ID.
    pub fn get(&self, column: &str) -> Option<CellValue> {
        if column == ID_COLUMN || column == ID_FIELD {
            return Some(CellValue::Number(self.id as f64));
        }
        self.values.get(column).cloned()
    }

    /// Borrow a non-ID value by column name
    pub fn value(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }
}

/// A decoded cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Numeric value (integers are stored as whole floats)
    Number(f64),
    /// Text value, possibly empty
    Text(String),
}

impl CellValue {
    /// Shorthand for a text value
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Check if the value is empty text
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }

    /// Numeric value, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }

    /// Text value, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Number(_) => None,
            CellValue::Text(s) => Some(s),
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // -0 prints as 0
            CellValue::Number(n) if *n == 0.0 => write!(f, "0"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}
