//! Domain models for quote fetching.

mod history;
mod instrument;
mod logo;
mod quote;
mod types;

pub use history::{HistoryPoint, HistoryRequest, HistorySeries, OhlcBar, TimeRange};
pub use instrument::{AssetClass, ExchangeListing, InstrumentKey};
pub use logo::LogoArtifact;
pub use quote::QuoteSample;
pub use types::{CurrencyId, ExchangeId};
