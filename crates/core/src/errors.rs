//! Core error types for the quotewatch engine.
//!
//! Fetch-level errors keep their own taxonomy in the market-data crate;
//! this module defines the root error the engine's services return plus
//! the validation errors raised at configuration time.

use thiserror::Error;

use quotewatch_market_data::FetchError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the polling engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Quote fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Artifact cache error: {0}")]
    Cache(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Validation errors for configuration entries.
///
/// These are rejected synchronously at setup time with a user-facing
/// message; an invalid entry never creates a tracked instrument.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid ISIN '{0}': expected 12 characters A-Z or 0-9")]
    InvalidIsin(String),

    #[error("Invalid poll interval {0}s: must be greater than zero")]
    NonPositiveInterval(i64),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Cache(err.to_string())
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
