use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Field '{0}' not found on model '{1}'")]
    UnknownField(String, String),

    #[error("Integrity anomaly: {0}")]
    IntegrityAnomaly(String),

    #[error("Record '{0}' has not been persisted")]
    NotPersisted(String),

    #[error("Field value unavailable: {0}")]
    FieldUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Non-fatal condition raised while capturing a snapshot.
///
/// A column that cannot be read is left out of the snapshot and the capture
/// carries on; the warning only ever reaches the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialCaptureWarning {
    pub model: String,
    pub field: String,
    pub reason: String,
}

impl fmt::Display for PartialCaptureWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped field '{}' while capturing '{}': {}",
            self.field, self.model, self.reason
        )
    }
}
