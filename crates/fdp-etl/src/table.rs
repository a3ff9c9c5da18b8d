//! In-memory tabular data
//!
//! [`DataTable`] is the structured payload flowing through parse, validate,
//! transform, and load. Rows keep source order; column names are unique
//! within a table. Load order does not matter to the persisted result, which
//! is keyed by a uniqueness constraint.

use chrono::NaiveDate;

use crate::error::EtlError;

/// A single table value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Text content, if this cell holds text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value into a cell
    ///
    /// Nested arrays and objects that survive flattening are kept as their
    /// serialized JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => Cell::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => write!(f, ""),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Date(d) => write!(f, "{}", d),
        }
    }
}

/// Rows by named columns, in source order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// Create an empty table with the given column names
    ///
    /// Fails if a column name repeats.
    pub fn new(columns: Vec<String>) -> Result<Self, EtlError> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(EtlError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Append a row; its width must match the column count
    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// All names in `names` are present as columns
    pub fn has_columns<'a, I: IntoIterator<Item = &'a str>>(&self, names: I) -> bool {
        names.into_iter().all(|name| self.has_column(name))
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Result<usize, EtlError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| EtlError::UnknownColumn(name.to_string()))
    }

    /// Cell at (row, column name)
    pub fn cell(&self, row: usize, column: &str) -> Result<&Cell, EtlError> {
        let idx = self.column_index(column)?;
        Ok(&self.rows[row][idx])
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }
}
