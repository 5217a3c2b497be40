//! In-memory tabular data.
//!
//! `DataTable` is the unit passed between the loader, normalizer and merger:
//! an ordered list of column names plus rows of typed cell values.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    /// Sentinel for a value that failed date coercion. Keeps the original
    /// text so it stays visible in the output and the error report.
    InvalidDate(String),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Text content for matching, grouping and output.
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::InvalidDate(s) => write!(f, "{}", s),
        }
    }
}

/// Ordered columns plus rows of values. Rows always have exactly one value
/// per column.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn set_value(&mut self, row: usize, column: &str, value: Value) {
        if let Some(col) = self.column_index(column) {
            if let Some(r) = self.rows.get_mut(row) {
                r[col] = value;
            }
        }
    }

    /// Renames columns according to `map`; columns not in the map keep
    /// their name.
    pub fn rename_columns(&mut self, map: &HashMap<String, String>) {
        for column in &mut self.columns {
            if let Some(renamed) = map.get(column) {
                *column = renamed.clone();
            }
        }
    }

    /// Restricts and reorders columns to exactly `columns`; columns absent
    /// from the table are added empty.
    pub fn select(&self, columns: &[String]) -> DataTable {
        let indices: Vec<Option<usize>> =
            columns.iter().map(|c| self.column_index(c)).collect();
        let mut out = DataTable::new(columns.to_vec());
        for row in &self.rows {
            let values = indices
                .iter()
                .map(|ix| ix.map_or(Value::Empty, |i| row[i].clone()))
                .collect();
            out.push_row(values);
        }
        out
    }
}
