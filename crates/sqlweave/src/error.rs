//! Error types for sqlweave

use thiserror::Error;

/// Result type alias for sqlweave operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Entity mapping is missing or invalid
    #[error("Schema error: {0}")]
    Schema(String),

    /// A bound type belongs to a different database than the query session
    #[error("{entity}({table}) does not belong to database {database}")]
    CrossDatabase {
        entity: &'static str,
        table: String,
        database: String,
    },

    /// The same entity type was bound twice in one query session
    #[error("{entity}({table}) is already registered in this query")]
    DuplicateRegistration {
        entity: &'static str,
        table: String,
    },

    /// An expression shape cannot be rendered or evaluated
    #[error("Compilation error: {0}")]
    Compilation(String),

    /// The configured engine has no SQL template for the requested operation
    #[error("Unsupported dialect operation: {0}")]
    UnsupportedDialect(String),

    /// The referenced database name is not configured
    #[error("Connection config error: {0}")]
    ConnectionConfig(String),

    /// Driver-reported failure while executing a statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// Row value cannot be converted to the declared property type
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl OrmError {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a compilation error
    pub fn compilation(message: impl Into<String>) -> Self {
        Self::Compilation(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Check if this is a duplicate registration error
    pub fn is_duplicate_registration(&self) -> bool {
        matches!(self, Self::DuplicateRegistration { .. })
    }

    /// Check if this is a cross-database error
    pub fn is_cross_database(&self) -> bool {
        matches!(self, Self::CrossDatabase { .. })
    }
}
