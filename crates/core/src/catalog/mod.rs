//! Exchange and currency catalog.
//!
//! Static lookup of selectable ids to display metadata, consumed read-only:
//! the scheduler reads the realtime flag and the exchange code used for
//! calendar lookups; the host's setup wizard reads the display names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use quotewatch_market_data::{CurrencyId, ExchangeId};

/// Display metadata for a selectable exchange.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub id: ExchangeId,
    /// Short code, also the key into the calendar registry.
    pub code: String,
    pub name: String,
    /// Realtime exchanges poll on the shorter realtime interval while open.
    pub realtime: bool,
}

/// Display metadata for a selectable currency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub id: CurrencyId,
    pub sign: String,
    pub name: String,
}

/// Read-only id catalog.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    exchanges: HashMap<ExchangeId, ExchangeInfo>,
    currencies: HashMap<CurrencyId, CurrencyInfo>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog matching the upstream id space.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (id, code, name, realtime) in [
            (1001, "TGT", "Direkthandel", true),
            (1002, "FRA", "Frankfurt", false),
            (1003, "STU", "Stuttgart", false),
            (1004, "DUS", "Düsseldorf", false),
            (2779, "ETR", "XETRA", true),
            (1006, "MUC", "München", false),
            (1007, "BEB", "Berlin", false),
            (1008, "HAM", "Hamburg", false),
            (1009, "HAJ", "Hannover", false),
            (3001, "UTC", "Nasdaq", false),
            (3002, "USC", "New York Stock Exchange", false),
        ] {
            catalog = catalog.with_exchange(ExchangeInfo {
                id,
                code: code.to_string(),
                name: name.to_string(),
                realtime,
            });
        }
        for (id, sign, name) in [
            (814, "€", "Euro"),
            (840, "$", "US-Dollar"),
            (826, "£", "Pound Sterling"),
            (756, "CHF", "Swiss Franc"),
        ] {
            catalog = catalog.with_currency(CurrencyInfo {
                id,
                sign: sign.to_string(),
                name: name.to_string(),
            });
        }
        catalog
    }

    pub fn with_exchange(mut self, info: ExchangeInfo) -> Self {
        self.exchanges.insert(info.id, info);
        self
    }

    pub fn with_currency(mut self, info: CurrencyInfo) -> Self {
        self.currencies.insert(info.id, info);
        self
    }

    pub fn exchange(&self, id: ExchangeId) -> Option<&ExchangeInfo> {
        self.exchanges.get(&id)
    }

    pub fn currency(&self, id: CurrencyId) -> Option<&CurrencyInfo> {
        self.currencies.get(&id)
    }

    /// Calendar code for an exchange id, when the id is known.
    pub fn exchange_code(&self, id: ExchangeId) -> Option<&str> {
        self.exchanges.get(&id).map(|info| info.code.as_str())
    }

    /// Whether an exchange is flagged for realtime polling.
    /// Unknown ids are not realtime.
    pub fn is_realtime(&self, id: ExchangeId) -> bool {
        self.exchanges.get(&id).map(|info| info.realtime).unwrap_or(false)
    }
}
