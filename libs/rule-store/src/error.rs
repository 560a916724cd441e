//! Rule store error types

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result type for rule store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Rule store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database file could not be opened or created
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Table creation failed
    #[error("Schema error: {0}")]
    Schema(String),

    /// Duplicate or dangling identifier
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Rule not found
    #[error("Rule not found: {0}")]
    NotFound(String),

    /// Rule rejected before reaching storage
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Any other statement failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON/CSV encoding error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File access error during import/export
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True for [`StoreError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return StoreError::ConstraintViolation(db_err.message().to_string());
                },
                _ if db_err.message().contains("constraint failed") => {
                    return StoreError::ConstraintViolation(db_err.message().to_string());
                },
                _ => {},
            }
        }
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<figment::Error> for StoreError {
    fn from(err: figment::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}
