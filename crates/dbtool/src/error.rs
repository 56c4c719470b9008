//! Error types for dbtool

use thiserror::Error;

/// Result type alias for dbtool operations
pub type DbtoolResult<T> = Result<T, DbtoolError>;

/// Error types for session, builder and handle operations
#[derive(Debug, Error)]
pub enum DbtoolError {
    /// An operation needing a database was invoked before one was bound
    #[error("No database is bound to this session")]
    NoDatabaseBound,

    /// The table an operation depends on does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Statement execution failed in a non-SQLite handle
    #[error("Execution error: {0}")]
    Execution(String),

    /// Statement execution failed in the embedded SQLite store
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The handle was used while closed
    #[error("Database '{0}' is not open")]
    NotOpen(String),

    /// Invalid builder or handle input detected before execution
    #[error("Validation error: {0}")]
    Validation(String),

    /// A cell could not be converted to the requested scalar type
    #[error("Conversion error on column '{column}': {message}")]
    Conversion { column: String, message: String },

    /// Configuration could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem error while managing database files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbtoolError {
    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a conversion error for a specific column
    pub fn conversion(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if the underlying statement failed to execute
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_) | Self::Sqlite(_))
    }

    /// Check if this is a missing-table error
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound(_))
    }

    /// Check if this is a missing-database error
    pub fn is_no_database(&self) -> bool {
        matches!(self, Self::NoDatabaseBound)
    }
}

impl From<toml::de::Error> for DbtoolError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
