//! Error taxonomy shared by every tracker component.

use rusqlite::ffi;
use rusqlite::ErrorCode;

#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid user roles: {0}")]
    InvalidRole(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Storage(rusqlite::Error),

    #[error("Corrupt stored JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt stored data: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        TrackerError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        TrackerError::Corrupt(message.into())
    }

    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::NotFound(_) => "not_found",
            TrackerError::InvalidRole(_) => "invalid_role",
            TrackerError::Validation(_) => "validation_error",
            TrackerError::Conflict(_) => "conflict",
            TrackerError::Transient(_) => "transient_error",
            TrackerError::Storage(_)
            | TrackerError::Serialization(_)
            | TrackerError::Corrupt(_) => "storage_error",
        }
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        let (code, extended, message) = match &err {
            rusqlite::Error::SqliteFailure(failure, message) => {
                (failure.code, failure.extended_code, message.clone())
            }
            _ => return TrackerError::Storage(err),
        };

        match code {
            ErrorCode::ConstraintViolation
                if extended == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || extended == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                TrackerError::Conflict(
                    message.unwrap_or_else(|| "uniqueness constraint violated".to_string()),
                )
            }
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                TrackerError::Transient(err.to_string())
            }
            _ => TrackerError::Storage(err),
        }
    }
}
