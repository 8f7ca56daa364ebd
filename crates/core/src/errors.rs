//! Core error types for the Navledger engine.
//!
//! Every error here is local-recoverable: services only swap in new ledger or
//! holding state after all fallible work succeeded, so a failure leaves the
//! last-good state in place.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use thiserror::Error;

use crate::nav::NavError;
use crate::timing::SettlementTiming;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the ledger engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Fetching NAV data failed; retryable on a later trigger.
    #[error("NAV data unavailable: {0}")]
    Nav(#[from] NavError),

    /// No settlement NAV exists (yet) for the trade; the trade is blocked.
    #[error("Insufficient NAV data for fund {code} on {date} ({timing})")]
    InsufficientNavData {
        code: String,
        date: NaiveDate,
        timing: SettlementTiming,
    },

    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    #[error("No holding for fund {0}")]
    HoldingNotFound(String),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

/// Storage-agnostic error type for the key-value state store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("I/O failure: {0}")]
    Io(String),

    /// A stored blob could not be encoded or decoded.
    #[error("Serialization failure for key '{key}': {message}")]
    Serialization { key: String, message: String },

    /// The key is not usable by this store.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

// === From implementations for common error types ===

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
        Error::Storage(StorageError::Io(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(StorageError::Serialization {
            key: String::new(),
            message: err.to_string(),
        })
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
