//! Quotewatch Market Data Crate
//!
//! Stateless fetch layer for the quotewatch polling engine.
//!
//! # Overview
//!
//! This crate wraps the upstream quote API in a small, shareable client:
//! - Instrument header quotes keyed by (ISIN, exchange, currency)
//! - Historical chart series (line or OHLC)
//! - Logo artifacts, decoded once at the boundary into a tagged variant
//! - Exchange listings and available chart ranges for an ISIN
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  InstrumentKey   |  (isin, exchange, currency)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  QuoteProvider   |  (trait; HttpQuoteProvider over reqwest)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   QuoteSample    |  -> Result<_, FetchError> with RetryClass
//! +------------------+
//! ```
//!
//! The client performs no retries and holds no per-instrument state; retry
//! policy lives in the scheduler (`quotewatch-core`), which correlates
//! backoff with per-instrument failure counts.

pub mod errors;
pub mod models;
pub mod provider;

// Re-export all public types from models
pub use models::{
    AssetClass, CurrencyId, ExchangeId, ExchangeListing, HistoryPoint, HistoryRequest,
    HistorySeries, InstrumentKey, LogoArtifact, OhlcBar, QuoteSample, TimeRange,
};

// Re-export error types
pub use errors::{FetchError, RetryClass};

// Re-export provider types
pub use provider::{HttpQuoteProvider, QuoteProvider, DEFAULT_BASE_URL};
