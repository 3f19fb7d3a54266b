use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{CurrencyId, ExchangeId};

/// Time ranges the chart endpoint accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    Intraday,
    OneWeek,
    OneMonth,
    OneYear,
    FiveYears,
    Maximum,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intraday => "Intraday",
            Self::OneWeek => "OneWeek",
            Self::OneMonth => "OneMonth",
            Self::OneYear => "OneYear",
            Self::FiveYears => "FiveYears",
            Self::Maximum => "Maximum",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Intraday" => Ok(Self::Intraday),
            "OneWeek" => Ok(Self::OneWeek),
            "OneMonth" => Ok(Self::OneMonth),
            "OneYear" => Ok(Self::OneYear),
            "FiveYears" => Ok(Self::FiveYears),
            "Maximum" => Ok(Self::Maximum),
            other => Err(format!("unknown time range: {other}")),
        }
    }
}

/// A historical series request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub isin: Arc<str>,
    pub exchange_id: ExchangeId,
    pub currency_id: CurrencyId,
    pub range: TimeRange,
    pub ohlc: bool,
}

impl HistoryRequest {
    /// Whether OHLC records should actually be requested.
    ///
    /// Intraday data has no OHLC aggregation upstream, so the flag is
    /// ignored for that range.
    pub fn effective_ohlc(&self) -> bool {
        self.ohlc && self.range != TimeRange::Intraday
    }
}

/// A single line-chart point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// A single OHLC bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// A decoded historical series, in the shape the request asked for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum HistorySeries {
    Line(Vec<HistoryPoint>),
    Ohlc(Vec<OhlcBar>),
}

impl HistorySeries {
    pub fn len(&self) -> usize {
        match self {
            Self::Line(points) => points.len(),
            Self::Ohlc(bars) => bars.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
