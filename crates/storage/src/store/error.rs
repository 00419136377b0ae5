#![forbid(unsafe_code)]

use super::sync::SyncStep;
use census_core::ValidationError;
use census_core::ids::RegistrantId;
use rusqlite::ErrorCode;

/// Failures raised by the relational store itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(rusqlite::Error),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("undecodable {table}.{column}: {reason}")]
    Decode {
        table: &'static str,
        column: String,
        reason: String,
    },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Sql(_) => "SQL",
            Self::Constraint(_) => "CONSTRAINT",
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Decode { .. } => "DECODE",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &value
            && code.code == ErrorCode::ConstraintViolation
        {
            return Self::Constraint(message.clone().unwrap_or_else(|| code.to_string()));
        }
        Self::Sql(value)
    }
}

/// A synchronizer step that the store rejected.
#[derive(Debug, thiserror::Error)]
#[error("step {step} failed: {cause}")]
pub struct PersistenceError {
    pub step: SyncStep,
    #[source]
    pub cause: StoreError,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("registrant {0} not found")]
    NotFound(RegistrantId),
    #[error("cancelled before step {step}")]
    Cancelled { step: SyncStep },
}

/// Error surface of the registrant API.
#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(PersistenceError),
    #[error("registrant {0} not found")]
    NotFound(RegistrantId),
    #[error("cancelled before step {step}")]
    Cancelled { step: SyncStep },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CensusError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Persistence(_) => "PERSISTENCE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Store(_) => "STORE",
        }
    }

    /// The synchronizer step this error is attributed to, if any.
    pub fn step(&self) -> Option<SyncStep> {
        match self {
            Self::Persistence(err) => Some(err.step),
            Self::Cancelled { step } => Some(*step),
            _ => None,
        }
    }
}

impl From<SyncError> for CensusError {
    fn from(value: SyncError) -> Self {
        match value {
            SyncError::Persistence(err) => Self::Persistence(err),
            SyncError::NotFound(id) => Self::NotFound(id),
            SyncError::Cancelled { step } => Self::Cancelled { step },
        }
    }
}
