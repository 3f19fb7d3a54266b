use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::instrument::AssetClass;

/// One successfully retrieved quote.
///
/// Immutable value; the tracker keeps the current sample and the previous
/// one just long enough to compute deltas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuoteSample {
    /// Last traded/quoted price.
    pub price: Decimal,

    /// Currency sign as reported by upstream ("€", "$", "%" for bonds).
    pub currency_sign: String,

    /// Upstream-reported instant of the last price change, when present.
    pub observed_at: Option<DateTime<Utc>>,

    /// Local instant at which this sample was retrieved.
    pub retrieved_at: DateTime<Utc>,

    /// Instrument display name from the header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Short code of the exchange that actually served the quote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_name: Option<String>,

    /// Asset classification from the header meta information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<AssetClass>,
}

impl QuoteSample {
    /// Create a sample with the minimal required fields.
    pub fn new(price: Decimal, currency_sign: String, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            price,
            currency_sign,
            observed_at: None,
            retrieved_at,
            name: None,
            exchange_code: None,
            exchange_name: None,
            asset_class: None,
        }
    }

    /// Whether this instrument quotes in percentage of par.
    ///
    /// Bonds are detected either by asset class or by upstream quoting the
    /// price with a "%" sign.
    pub fn is_bond(&self) -> bool {
        self.currency_sign.trim() == "%" || self.asset_class == Some(AssetClass::Bond)
    }
}
