use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::types::{CurrencyId, ExchangeId};

/// Unique key for a tracked instrument.
///
/// One instrument (ISIN) can be listed on several exchanges and quoted in
/// several currencies; each combination is tracked independently.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    /// 12-character alphanumeric ISIN.
    pub isin: Arc<str>,

    /// The exchange listing being tracked.
    pub exchange_id: ExchangeId,

    /// The quote currency being tracked.
    pub currency_id: CurrencyId,
}

impl InstrumentKey {
    pub fn new(isin: impl Into<Arc<str>>, exchange_id: ExchangeId, currency_id: CurrencyId) -> Self {
        Self {
            isin: isin.into(),
            exchange_id,
            currency_id,
        }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.isin, self.exchange_id, self.currency_id)
    }
}

/// Asset classification as reported in the instrument header.
///
/// Upstream reports the class as a localized label in the header's
/// additional meta information; [`from_label`](Self::from_label) maps the
/// known labels onto this enum. The class drives bond detection and the
/// logo endpoint path.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    ExchangeRate,
    Fund,
    Commodity,
    Share,
    Bond,
    Derivative,
}

impl AssetClass {
    /// Map an upstream header label (localized or English) onto a class.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Devisenkurs" | "ExchangeRate" => Some(Self::ExchangeRate),
            "ETF" | "Fonds" | "Fund" => Some(Self::Fund),
            "Rohstoff" | "Commodity" => Some(Self::Commodity),
            "Aktie" | "Share" => Some(Self::Share),
            "Anleihe" | "Bond" => Some(Self::Bond),
            "Zertifikate" | "Hebelprodukt" | "Derivative" => Some(Self::Derivative),
            _ => None,
        }
    }

    /// Canonical name used in upstream endpoint paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExchangeRate => "ExchangeRate",
            Self::Fund => "Fund",
            Self::Commodity => "Commodity",
            Self::Share => "Share",
            Self::Bond => "Bond",
            Self::Derivative => "Derivative",
        }
    }
}

/// One exchange/currency combination upstream offers for an instrument.
///
/// Returned by the exchange listing endpoint; consumed by the host's setup
/// wizard to populate its selectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeListing {
    pub exchange_id: ExchangeId,
    pub currency_id: CurrencyId,
    /// Short exchange code, e.g. "ETR".
    pub exchange_code: String,
    pub exchange_name: String,
    pub currency_sign: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = InstrumentKey::new("DE0007164600", 2779, 814);
        assert_eq!(key.to_string(), "DE0007164600@2779/814");
    }

    #[test]
    fn test_keys_differ_by_exchange() {
        let a = InstrumentKey::new("DE0007164600", 2779, 814);
        let b = InstrumentKey::new("DE0007164600", 1001, 814);
        assert_ne!(a, b);
    }

    #[test]
    fn test_asset_class_from_localized_label() {
        assert_eq!(AssetClass::from_label("Anleihe"), Some(AssetClass::Bond));
        assert_eq!(AssetClass::from_label("Aktie"), Some(AssetClass::Share));
        assert_eq!(AssetClass::from_label("ETF"), Some(AssetClass::Fund));
        assert_eq!(AssetClass::from_label("Fonds"), Some(AssetClass::Fund));
        assert_eq!(
            AssetClass::from_label("Hebelprodukt"),
            Some(AssetClass::Derivative)
        );
    }

    #[test]
    fn test_asset_class_from_english_label() {
        assert_eq!(AssetClass::from_label("Bond"), Some(AssetClass::Bond));
        assert_eq!(AssetClass::from_label(" Share "), Some(AssetClass::Share));
    }

    #[test]
    fn test_asset_class_unknown_label() {
        assert_eq!(AssetClass::from_label("Immobilie"), None);
    }
}
