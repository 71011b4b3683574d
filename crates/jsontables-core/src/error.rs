//! Error types for JsonTables core operations.
//!
//! Lower layers (crypto, coercion, query parsing, file IO) return
//! `Result<T, StoreError>`. The public `JsonTables` handle never returns these
//! directly: it folds them into a [`Diagnostics`](crate::Diagnostics) record
//! using their `Display` text.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for JsonTables operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Core error type for JsonTables operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required argument was empty or missing
    #[error("Missing required argument: {0}")]
    ArgumentMissing(&'static str),

    /// The handle has not been opened (or was closed)
    #[error("Handle is not initialized; call open() first")]
    NotInitialized,

    /// Table not found by name
    #[error("Table '{0}' not found")]
    TableMissing(String),

    /// Table name already taken
    #[error("Table '{0}' already exists")]
    TableExists(String),

    /// Column not found in a table
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnMissing { table: String, column: String },

    /// Column name already taken in a table
    #[error("Column '{column}' already exists in table '{table}'")]
    ColumnExists { table: String, column: String },

    /// Backing file does not exist
    #[error("File does not exist: {}", .0.display())]
    FileMissing(PathBuf),

    /// Backing file exists but has no content
    #[error("Missing content from file: {}", .0.display())]
    DataMissing(PathBuf),

    /// Document belongs to a different dataset
    #[error("Dataset name mismatch: expected '{expected}', file contains '{found}'")]
    DatasetNameMismatch { expected: String, found: String },

    /// Document could not be parsed or has an unusable shape
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Uniqueness constraint violated
    #[error("Column '{column}' in table '{table}' is constrained to be unique; value '{value}' is already present")]
    ConstraintViolation {
        table: String,
        column: String,
        value: String,
    },

    /// Where or order-by clause could not be parsed or evaluated
    #[error("Query error: {0}")]
    Query(String),

    /// A value could not be converted to the requested type
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Encryption or decryption error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Generic error (fallback)
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub(crate) fn column_missing(table: &str, column: &str) -> Self {
        StoreError::ColumnMissing {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub(crate) fn column_exists(table: &str, column: &str) -> Self {
        StoreError::ColumnExists {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_exists_message_mentions_already_exists() {
        let err = StoreError::column_exists("People", "Name");
        let message = err.to_string();
        assert!(message.contains("already exists"));
        assert!(message.contains("People"));
        assert!(message.contains("Name"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
