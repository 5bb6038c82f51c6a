//! Tabular results exchanged between providers and the router.
//!
//! Upstream endpoints disagree on field names, date formats and units; every
//! provider normalizes its payload into a [`DataTable`]: ordered named
//! columns over rows of flat scalar [`Cell`] values. No nested structures.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// A single scalar value in a [`DataTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered rows of named-column scalar data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// Create an empty table with the given column names.
    ///
    /// Column names must be non-empty and unique.
    pub fn new<I, S>(columns: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();

        for (index, name) in columns.iter().enumerate() {
            if name.is_empty() {
                return Err(ValidationError::EmptyColumnName);
            }
            if columns[..index].contains(name) {
                return Err(ValidationError::DuplicateColumn { name: name.clone() });
            }
        }

        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Append a row; the cell count must match the column count.
    pub fn push_row<I>(&mut self, cells: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = Cell>,
    {
        let row: Vec<Cell> = cells.into_iter().collect();
        if row.len() != self.columns.len() {
            return Err(ValidationError::RowArityMismatch {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Rename columns in place. `rename` returns the new name for a column,
    /// or `None` to keep the current one.
    pub fn rename_columns<F>(&mut self, rename: F)
    where
        F: Fn(&str) -> Option<&str>,
    {
        for column in &mut self.columns {
            if let Some(new_name) = rename(column) {
                *column = new_name.to_owned();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_columns() {
        let err = DataTable::new(["open", "close", "open"]).expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::DuplicateColumn {
                name: String::from("open")
            }
        );
    }

    #[test]
    fn rejects_row_with_wrong_arity() {
        let mut table = DataTable::new(["timestamp", "close"]).expect("valid columns");
        let err = table
            .push_row([Cell::from("2024-01-02")])
            .expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::RowArityMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn cell_lookup_by_column_name() {
        let mut table = DataTable::new(["timestamp", "close"]).expect("valid columns");
        table
            .push_row([Cell::from("2024-01-02"), Cell::from(10.42)])
            .expect("valid row");

        assert_eq!(table.cell(0, "close").and_then(Cell::as_f64), Some(10.42));
        assert!(table.cell(0, "volume").is_none());
        assert!(table.cell(1, "close").is_none());
    }

    #[test]
    fn serializes_cells_as_flat_scalars() {
        let mut table = DataTable::new(["symbol", "price", "halted"]).expect("valid columns");
        table
            .push_row([Cell::from("600000"), Cell::from(10.1), Cell::Null])
            .expect("valid row");

        let json = serde_json::to_value(&table).expect("serializable");
        assert_eq!(json["rows"][0][0], "600000");
        assert_eq!(json["rows"][0][1], 10.1);
        assert!(json["rows"][0][2].is_null());
    }
}
