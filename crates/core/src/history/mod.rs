//! Historical series retrieval.
//!
//! An externally triggered request/response operation: it shares the fetch
//! client with the scheduler but is independent of the polling state
//! machine. Results land in a single shared slot (last-write-wins; no
//! history of histories is kept) and are mirrored to a JSON file cache so a
//! failing upstream can rehydrate the slot instead of surfacing an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use quotewatch_market_data::{HistoryRequest, HistorySeries, QuoteProvider};

use crate::errors::Result;

/// Where a snapshot's series came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Live,
    Cache,
}

/// The current content of the shared history slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// The request, with the OHLC flag already normalized.
    pub request: HistoryRequest,
    pub series: HistorySeries,
    pub source: HistorySource,
    pub updated_at: DateTime<Utc>,
}

/// Fetches chart series and maintains the shared snapshot slot.
pub struct HistoryService {
    provider: Arc<dyn QuoteProvider>,
    cache_dir: PathBuf,
    latest: RwLock<Option<HistorySnapshot>>,
}

impl HistoryService {
    pub fn new(provider: Arc<dyn QuoteProvider>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            cache_dir: cache_dir.into(),
            latest: RwLock::new(None),
        }
    }

    /// Fetch a series and replace the shared slot.
    ///
    /// On upstream failure the file cache, if present, rehydrates the slot
    /// instead; only when both fail does the error surface.
    pub async fn fetch(&self, request: HistoryRequest) -> Result<HistorySnapshot> {
        let request = normalize(request);
        let path = self.cache_path(&request);

        let snapshot = match self.provider.fetch_history(&request).await {
            Ok(series) => {
                if let Err(err) = write_cache(&path, &series) {
                    warn!("history cache write failed for {}: {}", path.display(), err);
                }
                HistorySnapshot {
                    request,
                    series,
                    source: HistorySource::Live,
                    updated_at: Utc::now(),
                }
            }
            Err(fetch_err) => match read_cache(&path) {
                Some(series) => {
                    warn!(
                        "history fetch failed ({}), serving cached series from {}",
                        fetch_err,
                        path.display()
                    );
                    HistorySnapshot {
                        request,
                        series,
                        source: HistorySource::Cache,
                        updated_at: Utc::now(),
                    }
                }
                None => return Err(fetch_err.into()),
            },
        };

        *self.latest.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// The current slot content, if any request has completed yet.
    pub async fn latest(&self) -> Option<HistorySnapshot> {
        self.latest.read().await.clone()
    }

    /// Cache file location for a (normalized) request.
    pub fn cache_path(&self, request: &HistoryRequest) -> PathBuf {
        self.cache_dir.join(cache_filename(request))
    }
}

fn normalize(mut request: HistoryRequest) -> HistoryRequest {
    request.ohlc = request.effective_ohlc();
    request
}

fn cache_filename(request: &HistoryRequest) -> String {
    let flag = if request.ohlc { "ohlc" } else { "line" };
    format!(
        "{}__{}_{}__{}__{}.json",
        request.isin, request.exchange_id, request.currency_id, request.range, flag
    )
}

fn write_cache(path: &Path, series: &HistorySeries) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(series)?)?;
    Ok(())
}

fn read_cache(path: &Path) -> Option<HistorySeries> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(series) => Some(series),
        Err(err) => {
            debug!("ignoring unreadable history cache {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use quotewatch_market_data::{
        AssetClass, CurrencyId, ExchangeId, ExchangeListing, FetchError, HistoryPoint,
        LogoArtifact, QuoteSample, TimeRange,
    };

    /// Serves a fixed series (or an error) and records the requests it saw.
    struct FixedHistoryProvider {
        result: Mutex<Option<HistorySeries>>,
        requests: Mutex<Vec<HistoryRequest>>,
        calls: AtomicUsize,
    }

    impl FixedHistoryProvider {
        fn serving(series: HistorySeries) -> Self {
            Self {
                result: Mutex::new(Some(series)),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                result: Mutex::new(None),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn last_request(&self) -> Option<HistoryRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl QuoteProvider for FixedHistoryProvider {
        fn id(&self) -> &'static str {
            "FIXED"
        }

        async fn fetch_quote(
            &self,
            _isin: &str,
            _exchange_id: Option<ExchangeId>,
            _currency_id: CurrencyId,
        ) -> std::result::Result<QuoteSample, FetchError> {
            Err(FetchError::InvalidResponse("not under test".to_string()))
        }

        async fn fetch_history(
            &self,
            request: &HistoryRequest,
        ) -> std::result::Result<HistorySeries, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            match self.result.lock().unwrap().clone() {
                Some(series) => Ok(series),
                None => Err(FetchError::Unreachable("offline".to_string())),
            }
        }

        async fn fetch_logo(
            &self,
            _isin: &str,
            _asset_class: AssetClass,
        ) -> std::result::Result<LogoArtifact, FetchError> {
            Err(FetchError::InvalidResponse("not under test".to_string()))
        }

        async fn fetch_exchanges(
            &self,
            _isin: &str,
        ) -> std::result::Result<Vec<ExchangeListing>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_time_ranges(
            &self,
            _isin: &str,
        ) -> std::result::Result<Vec<TimeRange>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn line_series(price: rust_decimal::Decimal) -> HistorySeries {
        HistorySeries::Line(vec![HistoryPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap(),
            price,
        }])
    }

    fn request(range: TimeRange, ohlc: bool) -> HistoryRequest {
        HistoryRequest {
            isin: std::sync::Arc::from("DE0007164600"),
            exchange_id: 2779,
            currency_id: 814,
            range,
            ohlc,
        }
    }

    #[tokio::test]
    async fn test_live_fetch_fills_slot_and_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedHistoryProvider::serving(line_series(dec!(101.5))));
        let service = HistoryService::new(provider, dir.path());

        let snapshot = service.fetch(request(TimeRange::OneMonth, false)).await.unwrap();
        assert_eq!(snapshot.source, HistorySource::Live);
        assert_eq!(snapshot.series.len(), 1);

        let cached = service.latest().await.unwrap();
        assert_eq!(cached.series, snapshot.series);

        let path = service.cache_path(&snapshot.request);
        assert!(path.exists());
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "DE0007164600__2779_814__OneMonth__line.json"
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_rehydrates_from_cache() {
        let dir = tempfile::tempdir().unwrap();

        // First service run populates the cache file.
        let provider = Arc::new(FixedHistoryProvider::serving(line_series(dec!(88.0))));
        let service = HistoryService::new(provider, dir.path());
        service.fetch(request(TimeRange::OneYear, false)).await.unwrap();

        // Second run against a dead upstream serves the cached series.
        let offline = Arc::new(FixedHistoryProvider::failing());
        let service = HistoryService::new(offline, dir.path());
        let snapshot = service.fetch(request(TimeRange::OneYear, false)).await.unwrap();
        assert_eq!(snapshot.source, HistorySource::Cache);
        assert_eq!(snapshot.series, line_series(dec!(88.0)));
        assert!(service.latest().await.is_some());
    }

    #[tokio::test]
    async fn test_upstream_failure_without_cache_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = HistoryService::new(Arc::new(FixedHistoryProvider::failing()), dir.path());
        assert!(service.fetch(request(TimeRange::OneWeek, false)).await.is_err());
        assert!(service.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_intraday_ohlc_request_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedHistoryProvider::serving(line_series(dec!(1.0))));
        let service = HistoryService::new(Arc::clone(&provider) as Arc<dyn QuoteProvider>, dir.path());

        let snapshot = service.fetch(request(TimeRange::Intraday, true)).await.unwrap();
        assert!(!snapshot.request.ohlc);
        assert!(!provider.last_request().unwrap().ohlc);
    }

    #[tokio::test]
    async fn test_slot_is_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedHistoryProvider::serving(line_series(dec!(2.0))));
        let service = HistoryService::new(provider, dir.path());

        service.fetch(request(TimeRange::OneMonth, false)).await.unwrap();
        service.fetch(request(TimeRange::FiveYears, false)).await.unwrap();

        let latest = service.latest().await.unwrap();
        assert_eq!(latest.request.range, TimeRange::FiveYears);
    }
}
