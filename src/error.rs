/// LiveGrid error types
///
/// Errors fall into four classes:
/// - not found: an unknown table, row, column or view id
/// - invalid input: values that cannot be written or ids that collide
/// - consistency: the store lost a cell for an existing row/column pair (fatal)
/// - storage: the backing store itself failed
///
/// The query path never raises on filter, sort or search content. Those fail
/// closed inside the predicate compiler instead.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Row '{0}' not found")]
    RowNotFound(String),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("View '{0}' not found")]
    ViewNotFound(String),

    /// An existing (row, column) pair has no cell. The store invariant is broken.
    #[error("No cell for row '{row_id}' and column '{column_id}'")]
    MissingCell { row_id: String, column_id: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Column '{column}' holds {actual} values, got a {requested} update")]
    TypeMismatch {
        column: String,
        actual: String,
        requested: String,
    },

    #[error("Column named '{0}' already exists in this table")]
    DuplicateColumn(String),

    #[error("Row '{0}' already exists")]
    DuplicateRow(String),

    #[error("Table '{0}' already exists")]
    DuplicateTable(String),

    #[error("Store failure: {0}")]
    Store(String),
}

impl EngineError {
    /// True when the error signals a broken store invariant
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::MissingCell { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::TableNotFound(_)
                | EngineError::RowNotFound(_)
                | EngineError::ColumnNotFound(_)
                | EngineError::ViewNotFound(_)
        )
    }

    /// True for errors caused by the caller's input
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidValue(_)
                | EngineError::TypeMismatch { .. }
                | EngineError::DuplicateColumn(_)
                | EngineError::DuplicateRow(_)
                | EngineError::DuplicateTable(_)
        )
    }
}
