//! Logo artifact cache.
//!
//! Fetches an instrument's logo once and stores the decoded artifact on
//! disk keyed by ISIN: `<isin>.svg` for vector data, `<isin>.json` for
//! Lottie animation data. Re-invocation overwrites with the latest artifact;
//! failures are logged and degrade to "no logo", never an error the host
//! has to handle.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};

use quotewatch_market_data::{AssetClass, LogoArtifact, QuoteProvider};

use crate::config::is_valid_isin;
use crate::errors::Result;

/// Fetch-once logo cache over the shared provider.
pub struct LogoService {
    provider: Arc<dyn QuoteProvider>,
    cache_dir: PathBuf,
}

impl LogoService {
    pub fn new(provider: Arc<dyn QuoteProvider>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            cache_dir: cache_dir.into(),
        }
    }

    /// Make sure a cached artifact exists for the ISIN, fetching if needed.
    ///
    /// Returns the cached file path, or None when the logo is unavailable
    /// (network problem, unsupported content, bad ISIN).
    pub async fn ensure_logo(&self, isin: &str, asset_class: AssetClass) -> Option<PathBuf> {
        if !is_valid_isin(isin) {
            warn!("refusing logo lookup for invalid ISIN '{isin}'");
            return None;
        }
        if let Some(path) = self.cached_path(isin) {
            return Some(path);
        }
        self.fetch_and_store(isin, asset_class).await
    }

    /// Fetch and overwrite the cached artifact regardless of a cache hit.
    pub async fn refresh_logo(&self, isin: &str, asset_class: AssetClass) -> Option<PathBuf> {
        if !is_valid_isin(isin) {
            warn!("refusing logo refresh for invalid ISIN '{isin}'");
            return None;
        }
        self.fetch_and_store(isin, asset_class).await
    }

    /// Existing cached artifact for an ISIN, if any.
    pub fn cached_path(&self, isin: &str) -> Option<PathBuf> {
        ["svg", "json"]
            .iter()
            .map(|ext| self.cache_dir.join(format!("{isin}.{ext}")))
            .find(|path| path.exists())
    }

    async fn fetch_and_store(&self, isin: &str, asset_class: AssetClass) -> Option<PathBuf> {
        let artifact = match self.provider.fetch_logo(isin, asset_class).await {
            Ok(artifact) => artifact,
            Err(err) => {
                debug!("logo fetch failed for {isin}: {err}");
                return None;
            }
        };
        match self.store(isin, &artifact) {
            Ok(path) => Some(path),
            Err(err) => {
                debug!("logo cache write failed for {isin}: {err}");
                None
            }
        }
    }

    fn store(&self, isin: &str, artifact: &LogoArtifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)?;
        let path = self.cache_dir.join(format!("{isin}.{}", artifact.extension()));
        match artifact {
            LogoArtifact::Static(data) => fs::write(&path, data)?,
            LogoArtifact::Animated(value) => fs::write(&path, serde_json::to_vec(value)?)?,
        }
        // A refresh can change the artifact shape; drop the stale sibling so
        // the cache holds exactly one file per ISIN.
        let other_ext = if artifact.extension() == "svg" { "json" } else { "svg" };
        let _ = fs::remove_file(self.cache_dir.join(format!("{isin}.{other_ext}")));
        Ok(path)
    }
}
