//! Internal library error types

use thiserror::Error;

/// Storage and library internal errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Database operation failed
    #[error("Database error: {message}")]
    Database { message: String },

    /// Stored data could not be interpreted
    #[error("Corrupt record in '{table}': {message}")]
    CorruptRecord { table: String, message: String },

    /// File system failure
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    /// Internal assertion failure
    #[error("Internal assertion failed: {message}")]
    Assertion { message: String },
}

impl InternalError {
    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create a corrupt record error
    pub fn corrupt_record(table: &str, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            table: table.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a std I/O error
    pub fn io(source: std::io::Error) -> Self {
        Self::Io { source }
    }

    /// Create an internal assertion failure error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }
}
