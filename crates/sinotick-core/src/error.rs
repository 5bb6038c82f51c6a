use thiserror::Error;

/// Validation errors for domain inputs and table construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol must be a 6-digit A-share code with optional exchange prefix: '{value}'")]
    InvalidSymbol { value: String },
    #[error("no exchange can be derived for code '{value}'")]
    UnknownExchange { value: String },

    #[error("invalid interval '{value}', expected one of minute, hour, day, week, month")]
    InvalidInterval { value: String },
    #[error("invalid adjust '{value}', expected one of none, qfq, hfq")]
    InvalidAdjust { value: String },

    #[error("table column name cannot be empty")]
    EmptyColumnName,
    #[error("duplicate table column '{name}'")]
    DuplicateColumn { name: String },
    #[error("row has {got} cells, table has {expected} columns")]
    RowArityMismatch { expected: usize, got: usize },
}
