//! Core error types for Pricewatch.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.
//!
//! Errors carry structured context (operation, entity key) instead of
//! concatenated messages so callers can branch on [`Error::kind`].

use chrono::ParseError as ChronoParseError;
use std::fmt;
use thiserror::Error;

use crate::flyers::FlyerStatus;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of error categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entity absent, or no record satisfies a temporal resolution query.
    NotFound,
    /// A state-machine guard was violated or a concurrent writer won the race.
    InvalidState,
    /// The write would break a storage invariant (e.g. two open price windows).
    Conflict,
    /// Caller input failed validation.
    Validation,
    /// Persistence or configuration failure.
    Internal,
}

/// Entities addressed by this crate, used to tag `NotFound` and operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Flyer,
    PriceHistory,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Flyer => write!(f, "flyer"),
            Entity::PriceHistory => write!(f, "price history"),
        }
    }
}

/// Why a flyer transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidStateReason {
    /// The guard predicate rejected the loaded entity.
    GuardRejected,
    /// The entity changed between load and write (version mismatch).
    ConcurrentModification,
}

impl fmt::Display for InvalidStateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidStateReason::GuardRejected => write!(f, "guard rejected"),
            InvalidStateReason::ConcurrentModification => write!(f, "concurrent modification"),
        }
    }
}

/// Root error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },

    #[error("Cannot {operation} flyer {flyer_id} in status {status}: {reason}")]
    InvalidState {
        flyer_id: i64,
        status: FlyerStatus,
        operation: &'static str,
        reason: InvalidStateReason,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{operation} failed for {key}: {source}")]
    Operation {
        operation: &'static str,
        key: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
        Error::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidState { .. } => ErrorKind::InvalidState,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Operation { source, .. } | Error::Database(source) => match source {
                DatabaseError::NotFound(_) => ErrorKind::NotFound,
                DatabaseError::UniqueViolation(_) => ErrorKind::Conflict,
                _ => ErrorKind::Internal,
            },
            Error::InvalidConfigValue(_) | Error::Unexpected(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::InvalidState { reason, .. } => {
                *reason == InvalidStateReason::ConcurrentModification
            }
            _ => matches!(self.kind(), ErrorKind::Internal | ErrorKind::Conflict),
        }
    }

    /// Attaches operation and key context to a persistence failure.
    ///
    /// Errors that already carry domain meaning (not found, invalid state,
    /// conflict, validation) pass through unchanged.
    pub fn with_context(self, operation: &'static str, key: impl fmt::Display) -> Self {
        match self {
            Error::Database(DatabaseError::UniqueViolation(msg)) => Error::Conflict(msg),
            Error::Database(source) => Error::Operation {
                operation,
                key: key.to_string(),
                source,
            },
            other => other,
        }
    }
}

/// Extension trait adding [`Error::with_context`] to results.
pub trait ResultExt<T> {
    fn context(self, operation: &'static str, key: impl fmt::Display) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, operation: &'static str, key: impl fmt::Display) -> Result<T> {
        self.map_err(|e| e.with_context(operation, key))
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Invalid validity window: {0}")]
    InvalidWindow(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Unexpected(err.to_string())
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
