//! Quote provider trait definition.

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::models::{
    AssetClass, CurrencyId, ExchangeId, ExchangeListing, HistoryRequest, HistorySeries,
    LogoArtifact, QuoteSample, TimeRange,
};

/// Stateless client for the upstream quote API.
///
/// Implementations normalize transport and payload errors into the
/// [`FetchError`] taxonomy and perform no retries of their own; retry policy
/// belongs to the scheduler so backoff can be correlated with per-instrument
/// failure counts rather than per-call.
///
/// Implementations hold no per-instrument state and are safely shared.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Unique identifier for this provider, used in logging.
    fn id(&self) -> &'static str;

    /// Fetch the current instrument header quote.
    ///
    /// `exchange_id` of `None` asks upstream for its default listing; the
    /// scheduler uses this as a fallback when the selected listing serves a
    /// header without a price.
    async fn fetch_quote(
        &self,
        isin: &str,
        exchange_id: Option<ExchangeId>,
        currency_id: CurrencyId,
    ) -> Result<QuoteSample, FetchError>;

    /// Fetch a historical series for charting.
    async fn fetch_history(&self, request: &HistoryRequest) -> Result<HistorySeries, FetchError>;

    /// Fetch and decode the instrument logo.
    async fn fetch_logo(
        &self,
        isin: &str,
        asset_class: AssetClass,
    ) -> Result<LogoArtifact, FetchError>;

    /// Fetch the exchange/currency combinations upstream offers for an ISIN.
    async fn fetch_exchanges(&self, isin: &str) -> Result<Vec<ExchangeListing>, FetchError>;

    /// Fetch the chart time ranges upstream offers for an ISIN.
    async fn fetch_time_ranges(&self, isin: &str) -> Result<Vec<TimeRange>, FetchError>;
}
