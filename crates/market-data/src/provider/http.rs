//! HTTP implementation of the quote provider.
//!
//! Talks to the upstream components API over REST. All transport and payload
//! problems are normalized into the [`FetchError`] taxonomy at this boundary;
//! nothing here retries.
//!
//! # Endpoints
//!
//! - Instrument header: `{base}/instrumentheader/{isin}?currencyId=..&exchangeId=..`
//! - Chart data: `{base}/chartdata/{isin}?timeRange=..&exchangeId=..&currencyId=..&ohlc=..`
//! - Chart meta: `{base}/chartmeta/{isin}`
//! - Exchange listings: `{base}/exchanges/{isin}`
//! - Logo: `{base}/logos/{assetClass}/{isin}`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::FetchError;
use crate::models::{
    AssetClass, CurrencyId, ExchangeId, ExchangeListing, HistoryRequest, HistorySeries,
    HistoryPoint, LogoArtifact, OhlcBar, QuoteSample, TimeRange,
};
use crate::provider::QuoteProvider;

const PROVIDER_ID: &str = "COMPONENTS_API";

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://component-api.wertpapiere.ing.de/api/v1";

/// Every request carries a bounded timeout; hitting it is an
/// [`FetchError::Unreachable`].
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of body bytes echoed into error messages.
const MAX_PREVIEW: usize = 200;

/// Instrument header payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentHeader {
    price: Option<Decimal>,
    currency_sign: Option<String>,
    /// Instant of the last price change; string or epoch, sometimes absent.
    price_change_date: Option<Value>,
    name: Option<String>,
    exchange_code: Option<String>,
    exchange_name: Option<String>,
    #[serde(default)]
    additional_meta_information: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExchangesResponse {
    #[serde(default)]
    exchanges: Vec<ExchangeListing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMetaResponse {
    #[serde(default)]
    time_ranges: Vec<String>,
}

/// REST client for the upstream quote API.
///
/// Holds no per-instrument state; a single instance is shared by the
/// scheduler and the externally triggered history/logo operations.
pub struct HttpQuoteProvider {
    client: Client,
    base_url: String,
}

impl HttpQuoteProvider {
    /// Create a provider against the default upstream.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a provider against a custom base URL (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Issue a GET and map transport/status problems into [`FetchError`].
    async fn get(&self, url: &str, subject: &str) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Unreachable(format!("request timed out: {url}"))
            } else {
                FetchError::Unreachable(e.to_string())
            }
        })?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(FetchError::NotFound(subject.to_string()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(FetchError::InvalidResponse(format!(
                    "HTTP {status}: {}",
                    preview(&body)
                )))
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
    ) -> Result<T, FetchError> {
        let response = self.get(url, subject).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("{e}: {}", preview(&body))))
    }
}

impl Default for HttpQuoteProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_quote(
        &self,
        isin: &str,
        exchange_id: Option<ExchangeId>,
        currency_id: CurrencyId,
    ) -> Result<QuoteSample, FetchError> {
        let mut url = format!(
            "{}/instrumentheader/{}?currencyId={}",
            self.base_url,
            urlencoding::encode(isin),
            currency_id
        );
        if let Some(exchange_id) = exchange_id {
            url.push_str(&format!("&exchangeId={exchange_id}"));
        }

        let header: InstrumentHeader = self.get_json(&url, isin).await?;

        let price = header
            .price
            .ok_or_else(|| FetchError::InvalidResponse("header missing price".to_string()))?;

        let asset_class = header
            .additional_meta_information
            .first()
            .and_then(|label| AssetClass::from_label(label));

        Ok(QuoteSample {
            price,
            currency_sign: header.currency_sign.unwrap_or_default(),
            observed_at: header.price_change_date.as_ref().and_then(parse_instant),
            retrieved_at: Utc::now(),
            name: header.name,
            exchange_code: header.exchange_code,
            exchange_name: header.exchange_name,
            asset_class,
        })
    }

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<HistorySeries, FetchError> {
        let ohlc = request.effective_ohlc();
        let url = format!(
            "{}/chartdata/{}?timeRange={}&exchangeId={}&currencyId={}&ohlc={}",
            self.base_url,
            urlencoding::encode(&request.isin),
            request.range,
            request.exchange_id,
            request.currency_id,
            ohlc
        );

        let payload: Value = self.get_json(&url, &request.isin).await?;
        let series = decode_series(&payload, ohlc)?;
        debug!(
            "fetched {} history records for {} ({})",
            series.len(),
            request.isin,
            request.range
        );
        Ok(series)
    }

    async fn fetch_logo(
        &self,
        isin: &str,
        asset_class: AssetClass,
    ) -> Result<LogoArtifact, FetchError> {
        let url = format!(
            "{}/logos/{}/{}",
            self.base_url,
            urlencoding::encode(asset_class.as_str()),
            urlencoding::encode(isin)
        );

        let response = self.get(&url, isin).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        LogoArtifact::decode(content_type.as_deref(), &body)
    }

    async fn fetch_exchanges(&self, isin: &str) -> Result<Vec<ExchangeListing>, FetchError> {
        let url = format!("{}/exchanges/{}", self.base_url, urlencoding::encode(isin));
        let response: ExchangesResponse = self.get_json(&url, isin).await?;
        Ok(response.exchanges)
    }

    async fn fetch_time_ranges(&self, isin: &str) -> Result<Vec<TimeRange>, FetchError> {
        let url = format!("{}/chartmeta/{}", self.base_url, urlencoding::encode(isin));
        let response: ChartMetaResponse = self.get_json(&url, isin).await?;

        // Unknown labels are skipped rather than failing the whole call.
        let mut ranges = Vec::with_capacity(response.time_ranges.len());
        for label in &response.time_ranges {
            match label.parse::<TimeRange>() {
                Ok(range) => ranges.push(range),
                Err(_) => debug!("skipping unknown time range label '{label}'"),
            }
        }
        Ok(ranges)
    }
}

/// Truncate a response body for inclusion in error messages.
fn preview(body: &str) -> &str {
    if body.len() <= MAX_PREVIEW {
        return body;
    }
    let mut end = MAX_PREVIEW;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Parse the upstream price-change instant.
///
/// Comes as an RFC 3339 string, epoch seconds, or epoch milliseconds
/// depending on the instrument.
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            let millis = if raw > 1e11 { raw } else { raw * 1000.0 };
            DateTime::from_timestamp_millis(millis as i64)
        }
        _ => None,
    }
}

/// Decode the chart payload into a series.
///
/// The payload nests the records under `instruments[0].data`; each record is
/// an array `[timestamp_ms, price]` or `[timestamp_ms, open, high, low, close]`.
fn decode_series(payload: &Value, ohlc: bool) -> Result<HistorySeries, FetchError> {
    let data = payload
        .get("instruments")
        .and_then(Value::as_array)
        .and_then(|instruments| instruments.first())
        .and_then(|instrument| instrument.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FetchError::InvalidResponse("chart payload missing instruments[0].data".to_string())
        })?;

    if ohlc {
        let mut bars = Vec::with_capacity(data.len());
        for record in data {
            let fields = record_fields(record, 5)?;
            bars.push(OhlcBar {
                timestamp: record_timestamp(&fields[0])?,
                open: record_decimal(&fields[1])?,
                high: record_decimal(&fields[2])?,
                low: record_decimal(&fields[3])?,
                close: record_decimal(&fields[4])?,
            });
        }
        Ok(HistorySeries::Ohlc(bars))
    } else {
        let mut points = Vec::with_capacity(data.len());
        for record in data {
            let fields = record_fields(record, 2)?;
            points.push(HistoryPoint {
                timestamp: record_timestamp(&fields[0])?,
                price: record_decimal(&fields[1])?,
            });
        }
        Ok(HistorySeries::Line(points))
    }
}

fn record_fields(record: &Value, expected: usize) -> Result<&[Value], FetchError> {
    let fields = record.as_array().ok_or_else(|| {
        FetchError::InvalidResponse("chart record is not an array".to_string())
    })?;
    if fields.len() < expected {
        return Err(FetchError::InvalidResponse(format!(
            "chart record has {} fields, expected {expected}",
            fields.len()
        )));
    }
    Ok(fields)
}

fn record_timestamp(value: &Value) -> Result<DateTime<Utc>, FetchError> {
    value
        .as_i64()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| FetchError::InvalidResponse("chart record has invalid timestamp".to_string()))
}

fn record_decimal(value: &Value) -> Result<Decimal, FetchError> {
    let raw = value
        .as_f64()
        .ok_or_else(|| FetchError::InvalidResponse("chart record has non-numeric price".to_string()))?;
    Decimal::try_from(raw)
        .map_err(|e| FetchError::InvalidResponse(format!("chart price out of range: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_instant_rfc3339() {
        let value = json!("2024-03-06T16:30:00+01:00");
        let parsed = parse_instant(&value).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-06T15:30:00+00:00");
    }

    #[test]
    fn test_parse_instant_epoch_seconds() {
        let value = json!(1_709_740_800);
        let parsed = parse_instant(&value).unwrap();
        assert_eq!(parsed.timestamp(), 1_709_740_800);
    }

    #[test]
    fn test_parse_instant_epoch_millis() {
        let value = json!(1_709_740_800_000i64);
        let parsed = parse_instant(&value).unwrap();
        assert_eq!(parsed.timestamp(), 1_709_740_800);
    }

    #[test]
    fn test_parse_instant_garbage() {
        assert!(parse_instant(&json!("yesterday")).is_none());
        assert!(parse_instant(&json!(null)).is_none());
    }

    #[test]
    fn test_decode_line_series() {
        let payload = json!({
            "instruments": [
                { "data": [[1_709_740_800_000i64, 101.5], [1_709_740_860_000i64, 101.7]] }
            ]
        });
        let series = decode_series(&payload, false).unwrap();
        match series {
            HistorySeries::Line(points) => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[0].price, dec!(101.5));
            }
            other => panic!("expected line series, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_ohlc_series() {
        let payload = json!({
            "instruments": [
                { "data": [[1_709_740_800_000i64, 100.0, 102.0, 99.5, 101.25]] }
            ]
        });
        let series = decode_series(&payload, true).unwrap();
        match series {
            HistorySeries::Ohlc(bars) => {
                assert_eq!(bars.len(), 1);
                assert_eq!(bars[0].high, dec!(102.0));
                assert_eq!(bars[0].close, dec!(101.25));
            }
            other => panic!("expected ohlc series, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_series_missing_data() {
        let payload = json!({ "instruments": [] });
        assert!(matches!(
            decode_series(&payload, false),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_decode_series_short_record() {
        let payload = json!({
            "instruments": [ { "data": [[1_709_740_800_000i64, 100.0]] } ]
        });
        assert!(matches!(
            decode_series(&payload, true),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(1000);
        assert_eq!(preview(&long).len(), MAX_PREVIEW);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_header_deserializes_with_missing_fields() {
        let header: InstrumentHeader = serde_json::from_value(json!({
            "price": 42.17,
            "currencySign": "€",
            "additionalMetaInformation": ["Aktie"]
        }))
        .unwrap();
        assert_eq!(header.price, Some(dec!(42.17)));
        assert!(header.price_change_date.is_none());
        assert_eq!(header.additional_meta_information, vec!["Aktie"]);
    }
}
