//! Result validation against a router contract.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::DataTable;

/// Reason a provider result failed the attached contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("missing required columns: {{{}}}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },
    #[error("empty result")]
    EmptyResult,
    #[error("insufficient rows: got {got}, need {need}")]
    InsufficientRows { got: usize, need: usize },
}

/// Validation policy attached to a router instance.
///
/// The default policy requires no particular columns but at least one row:
/// an empty table is operationally equivalent to "no usable data", so it is
/// a failed attempt unless `min_rows` is explicitly set to 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultContract {
    required_columns: BTreeSet<String>,
    min_rows: usize,
}

impl Default for ResultContract {
    fn default() -> Self {
        Self {
            required_columns: BTreeSet::new(),
            min_rows: 1,
        }
    }
}

impl ResultContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn required_columns(&self) -> &BTreeSet<String> {
        &self.required_columns
    }

    pub fn min_rows(&self) -> usize {
        self.min_rows
    }

    /// Decide whether `table` satisfies this contract.
    ///
    /// Pure function of the table and the contract. Extra columns beyond the
    /// required set never fail; only missing required columns do.
    pub fn validate(&self, table: &DataTable) -> Result<(), ContractViolation> {
        let missing: Vec<String> = self
            .required_columns
            .iter()
            .filter(|column| !table.has_column(column))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ContractViolation::MissingColumns { columns: missing });
        }

        if table.is_empty() && self.min_rows > 0 {
            return Err(ContractViolation::EmptyResult);
        }

        if table.row_count() < self.min_rows {
            return Err(ContractViolation::InsufficientRows {
                got: table.row_count(),
                need: self.min_rows,
            });
        }

        Ok(())
    }
}
