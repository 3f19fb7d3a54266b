//! Error types and retry classification for quote fetching.
//!
//! This module provides:
//! - [`FetchError`]: The error enum for all upstream quote API operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to the upstream quote API.
///
/// The client performs no retries itself; each variant is classified into a
/// [`RetryClass`] via [`retry_class`](Self::retry_class), which the scheduler
/// uses to correlate backoff with per-instrument failure counts.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure: connection refused, DNS, TLS, or a request
    /// that hit its timeout before upstream answered.
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    /// Upstream answered but the payload was malformed or missing required
    /// fields. Retryable with backoff, since upstream sometimes returns
    /// transient garbage.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The instrument/exchange/currency combination was rejected by upstream.
    /// This is a terminal error - the instrument should be suspended.
    #[error("Instrument not found: {0}")]
    NotFound(String),

    /// Upstream signaled explicit throttling (HTTP 429).
    /// Retryable after a mandatory cool-down distinct from normal backoff.
    #[error("Rate limited by upstream")]
    RateLimited,
}

impl FetchError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotewatch_market_data::errors::{FetchError, RetryClass};
    ///
    /// let error = FetchError::RateLimited;
    /// assert_eq!(error.retry_class(), RetryClass::AfterCooldown);
    ///
    /// let error = FetchError::NotFound("XX0000000000".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::NotFound(_) => RetryClass::Never,
            Self::Unreachable(_) | Self::InvalidResponse(_) => RetryClass::WithBackoff,
            Self::RateLimited => RetryClass::AfterCooldown,
        }
    }
}
