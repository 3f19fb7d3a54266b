//! Configuration entries and engine settings.
//!
//! A [`ConfigEntry`] is what the host platform's setup wizard hands over for
//! one tracked instrument. It is validated here, synchronously, before a
//! scheduling lane is created; a rejected entry never reaches the scheduler.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use quotewatch_market_data::{CurrencyId, ExchangeId, InstrumentKey};

use crate::errors::ValidationError;

static ISIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{12}$").expect("static pattern compiles"));

/// Syntactic ISIN check (12 characters, A-Z or 0-9).
pub fn is_valid_isin(isin: &str) -> bool {
    ISIN_RE.is_match(isin)
}

/// One tracked-instrument configuration as supplied by the setup wizard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub isin: String,
    pub exchange_id: ExchangeId,
    pub currency_id: CurrencyId,
    /// Poll interval used while the exchange is open but not flagged realtime.
    pub fallback_interval_seconds: i64,
}

impl ConfigEntry {
    /// Validate the entry.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_isin(&self.isin) {
            return Err(ValidationError::InvalidIsin(self.isin.clone()));
        }
        if self.fallback_interval_seconds <= 0 {
            return Err(ValidationError::NonPositiveInterval(
                self.fallback_interval_seconds,
            ));
        }
        Ok(())
    }

    pub fn instrument_key(&self) -> InstrumentKey {
        InstrumentKey::new(self.isin.as_str(), self.exchange_id, self.currency_id)
    }

    pub fn fallback_interval(&self) -> Duration {
        Duration::from_secs(self.fallback_interval_seconds.max(0) as u64)
    }
}

/// Tunables for the polling scheduler.
///
/// Durations are carried as whole seconds so the settings stay trivially
/// serializable alongside the host's configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Consecutive retryable failures before an instrument turns Degraded.
    pub degraded_threshold: u32,
    /// Upper bound on any closed-market sleep; guards against calendar
    /// errors that would otherwise sleep indefinitely.
    pub safety_ceiling_secs: u64,
    /// First backoff step after a retryable failure.
    pub backoff_base_secs: u64,
    /// Backoff never exceeds this, regardless of the failure count.
    pub backoff_cap_secs: u64,
    /// Mandatory cool-down after an explicit throttling signal.
    pub rate_limit_cooldown_secs: u64,
    /// Poll interval for exchanges flagged realtime, while open.
    pub realtime_interval_secs: u64,
    /// Bound on a single fetch call; elapsing counts as unreachable.
    pub fetch_timeout_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            degraded_threshold: 3,
            safety_ceiling_secs: 4 * 60 * 60,
            backoff_base_secs: 30,
            backoff_cap_secs: 30 * 60,
            rate_limit_cooldown_secs: 5 * 60,
            realtime_interval_secs: 30,
            fetch_timeout_secs: 10,
        }
    }
}

impl SchedulerSettings {
    pub fn safety_ceiling(&self) -> Duration {
        Duration::from_secs(self.safety_ceiling_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_secs)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }

    pub fn realtime_interval(&self) -> Duration {
        Duration::from_secs(self.realtime_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
