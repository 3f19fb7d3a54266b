/// Upstream-assigned numeric identifier for an exchange listing.
pub type ExchangeId = i64;

/// Upstream-assigned numeric identifier for a quote currency.
pub type CurrencyId = i64;
