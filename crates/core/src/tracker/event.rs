//! Publish event types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quotewatch_market_data::InstrumentKey;

/// Freshness state of a tracked instrument.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteState {
    /// Never successfully polled.
    Pending,
    /// Has at least one successful sample.
    Fresh,
    /// The last N consecutive polls failed; values may be stale.
    Degraded,
    /// Upstream rejected the instrument/exchange/currency combination.
    /// Requires a configuration change to exit.
    Suspended,
}

impl std::fmt::Display for QuoteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Fresh => write!(f, "fresh"),
            Self::Degraded => write!(f, "degraded"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

/// Unit of the absolute change value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeUnit {
    /// Instrument currency.
    Currency,
    /// Percentage points of par (bonds).
    PercentagePoints,
}

/// Event delivered to the publication sink.
///
/// Emitted on every state transition and on every successful sample; on
/// closed-market ticks the previous event is re-emitted unchanged. `None`
/// fields mean "unavailable", never zero.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublishEvent {
    pub key: InstrumentKey,
    pub price: Option<Decimal>,
    pub currency_sign: Option<String>,
    pub change_percent: Option<Decimal>,
    pub change_absolute: Option<Decimal>,
    pub change_unit: ChangeUnit,
    pub state: QuoteState,
    pub retrieved_at: Option<DateTime<Utc>>,
}
