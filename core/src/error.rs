use compact_str::CompactString;
use rowgate_types::SemanticType;
use thiserror::Error;

/// Errors raised by the data-access layer.
///
/// Everything except [`RowgateError::ExecutionFailure`] is detected while
/// compiling, before any statement reaches the database, and is never retried.
/// The enum is `Clone` so a failed batch can hand the same error to every
/// requester that was waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowgateError {
    /// Mutation without a where condition, or an update without values
    #[error("Invalid mutation: {0}")]
    InvalidMutation(CompactString),

    /// Operand type disagrees with the column's semantic type
    #[error("Type mismatch on {table}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        table: CompactString,
        column: CompactString,
        expected: SemanticType,
        found: &'static str,
    },

    /// Unknown column or relation name
    #[error("Unknown field {field} on table {table}")]
    UnknownField {
        table: CompactString,
        field: CompactString,
    },

    /// Table missing from the schema metadata
    #[error("Unknown table {0}")]
    UnknownTable(CompactString),

    /// Column set that is not a declared key, or a key value of the wrong shape
    #[error("No loadable key ({columns}) on table {table}")]
    UnknownKey {
        table: CompactString,
        columns: CompactString,
    },

    /// Cursor references columns outside the active ordering
    #[error("Invalid cursor: {0}")]
    InvalidCursor(CompactString),

    /// Any failure reported by the execution interface
    #[error("Execution error: {0}")]
    ExecutionFailure(String),

    /// Row decoding or configuration parsing failed
    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl RowgateError {
    pub(crate) fn unknown_field(table: &str, field: &str) -> Self {
        Self::UnknownField {
            table: table.into(),
            field: field.into(),
        }
    }

    pub(crate) fn type_mismatch(
        table: &str,
        column: &str,
        expected: SemanticType,
        found: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            table: table.into(),
            column: column.into(),
            expected,
            found,
        }
    }

    /// Returns `true` for errors raised by the execution interface.
    #[must_use]
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Self::ExecutionFailure(_))
    }
}

#[cfg(feature = "rusqlite")]
impl From<rusqlite::Error> for RowgateError {
    fn from(value: rusqlite::Error) -> Self {
        Self::ExecutionFailure(value.to_string())
    }
}

/// Result type for data-access operations
pub type Result<T> = std::result::Result<T, RowgateError>;
