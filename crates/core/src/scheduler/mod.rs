//! Adaptive polling scheduler.
//!
//! Owns one logical timer per tracked instrument and decides, independently
//! per instrument, when to poll next:
//!
//! 1. Consult the calendar at "now".
//! 2. Closed: no network call; re-emit the last publish event and sleep
//!    until the next session boundary (bounded by a safety ceiling).
//! 3. Open (or Unknown): fetch. Success sleeps the effective interval;
//!    retryable failures sleep an exponential backoff; throttling sleeps a
//!    mandatory cool-down; an upstream rejection suspends the lane.
//!
//! Each instrument runs on its own owning task (a "lane"), so wakes for one
//! key never overlap and different keys proceed fully independently.
//! Removing an instrument signals its lane; an in-flight fetch completes but
//! its result is discarded before any state mutation.

mod plan;


pub use plan::TickAction;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use quotewatch_market_data::{
    ExchangeId, FetchError, InstrumentKey, QuoteProvider, QuoteSample, RetryClass,
};

use crate::calendar::{CalendarRegistry, SessionStatus};
use crate::catalog::Catalog;
use crate::config::{ConfigEntry, SchedulerSettings};
use crate::errors::Result;
use crate::tracker::{InstrumentTracker, PublishSink};

struct Lane {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Everything a lane needs, resolved once at spawn time.
struct LaneContext {
    key: InstrumentKey,
    fallback_interval: Duration,
    exchange_code: Option<String>,
    realtime: bool,
    settings: SchedulerSettings,
    provider: Arc<dyn QuoteProvider>,
    sink: Arc<dyn PublishSink>,
    calendars: Arc<CalendarRegistry>,
}

/// The polling engine.
///
/// Holds the explicit collection of tracked instruments; there is no
/// ambient global state. The calendar registry, catalog and provider are
/// shared read-only across lanes.
pub struct PollScheduler {
    provider: Arc<dyn QuoteProvider>,
    sink: Arc<dyn PublishSink>,
    calendars: Arc<CalendarRegistry>,
    catalog: Arc<Catalog>,
    settings: SchedulerSettings,
    lanes: Mutex<HashMap<InstrumentKey, Lane>>,
}

impl PollScheduler {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        sink: Arc<dyn PublishSink>,
        calendars: Arc<CalendarRegistry>,
        catalog: Arc<Catalog>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            provider,
            sink,
            calendars,
            catalog,
            settings,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Start tracking an instrument.
    ///
    /// The entry is validated synchronously; an invalid entry never creates
    /// a lane. Tracking an already-tracked key replaces its lane, which also
    /// clears a `Suspended` state - recreating the configuration is the one
    /// way out of suspension.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track(&self, entry: &ConfigEntry) -> Result<InstrumentKey> {
        entry.validate()?;
        let key = entry.instrument_key();

        let context = LaneContext {
            key: key.clone(),
            fallback_interval: entry.fallback_interval(),
            exchange_code: self
                .catalog
                .exchange_code(entry.exchange_id)
                .map(|code| code.to_string()),
            realtime: self.catalog.is_realtime(entry.exchange_id),
            settings: self.settings.clone(),
            provider: Arc::clone(&self.provider),
            sink: Arc::clone(&self.sink),
            calendars: Arc::clone(&self.calendars),
        };

        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(run_lane(context, receiver));

        let mut lanes = self.lanes.lock().unwrap();
        if let Some(previous) = lanes.insert(key.clone(), Lane { shutdown, task }) {
            debug!("{}: replacing existing lane", key);
            let _ = previous.shutdown.send(true);
        }
        info!("{}: tracking started", key);
        Ok(key)
    }

    /// Stop tracking an instrument.
    ///
    /// The lane's pending timer is cancelled; an in-flight fetch is allowed
    /// to complete but its result is discarded. Returns false when the key
    /// was not tracked.
    pub fn untrack(&self, key: &InstrumentKey) -> bool {
        let lane = self.lanes.lock().unwrap().remove(key);
        match lane {
            Some(lane) => {
                let _ = lane.shutdown.send(true);
                info!("{}: tracking stopped", key);
                true
            }
            None => false,
        }
    }

    pub fn is_tracked(&self, key: &InstrumentKey) -> bool {
        self.lanes.lock().unwrap().contains_key(key)
    }

    pub fn tracked_keys(&self) -> Vec<InstrumentKey> {
        self.lanes.lock().unwrap().keys().cloned().collect()
    }

    /// Stop all lanes and wait for them to finish.
    pub async fn shutdown(&self) {
        let lanes: Vec<Lane> = {
            let mut guard = self.lanes.lock().unwrap();
            guard.drain().map(|(_, lane)| lane).collect()
        };
        for lane in &lanes {
            let _ = lane.shutdown.send(true);
        }
        for lane in lanes {
            let _ = lane.task.await;
        }
    }
}

/// One instrument's polling loop.
async fn run_lane(context: LaneContext, mut shutdown: watch::Receiver<bool>) {
    let mut tracker =
        InstrumentTracker::new(context.key.clone(), context.settings.degraded_threshold);
    let mut delay = Duration::ZERO;

    loop {
        if !delay.is_zero() {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if *shutdown.borrow() {
            break;
        }

        let now = Utc::now();
        let status = match context.exchange_code.as_deref() {
            Some(code) => context.calendars.status(code, now),
            None => SessionStatus::Unknown,
        };

        match plan::plan_wake(status, tracker.state()) {
            TickAction::Republish => {
                tracker.republish(context.sink.as_ref());
                let boundary = context
                    .exchange_code
                    .as_deref()
                    .and_then(|code| context.calendars.next_boundary(code, now));
                delay = plan::closed_sleep(now, boundary, context.settings.safety_ceiling());
                debug!("{}: market closed, next wake in {:?}", context.key, delay);
            }
            TickAction::Fetch => {
                let result = fetch_quote(&context).await;
                if *shutdown.borrow() {
                    // Cancelled while the fetch was in flight: the result is
                    // discarded, no state mutation is observable.
                    break;
                }
                match result {
                    Ok(sample) => {
                        tracker.record_success(sample, context.sink.as_ref());
                        delay = if status == SessionStatus::Closed {
                            // Initial closed-market fetch: hold the sample
                            // until the session boundary.
                            let boundary = context
                                .exchange_code
                                .as_deref()
                                .and_then(|code| context.calendars.next_boundary(code, now));
                            plan::closed_sleep(now, boundary, context.settings.safety_ceiling())
                        } else {
                            plan::effective_interval(
                                context.realtime,
                                context.settings.realtime_interval(),
                                context.fallback_interval,
                            )
                        };
                    }
                    Err(error) => {
                        let state = tracker.record_failure(&error, context.sink.as_ref());
                        match error.retry_class() {
                            RetryClass::Never => {
                                info!(
                                    "{}: {} - no further polls until reconfigured",
                                    context.key, state
                                );
                                return;
                            }
                            RetryClass::AfterCooldown => {
                                delay = context.settings.rate_limit_cooldown();
                                debug!("{}: rate limited, cooling down {:?}", context.key, delay);
                            }
                            RetryClass::WithBackoff => {
                                delay = plan::backoff_delay(
                                    context.settings.backoff_base(),
                                    context.settings.backoff_cap(),
                                    tracker.consecutive_failures(),
                                );
                                debug!(
                                    "{}: fetch failed ({}), backing off {:?}",
                                    context.key, error, delay
                                );
                            }
                        }
                    }
                }
            }
        }
    }
    debug!("{}: lane stopped", context.key);
}

/// Fetch the quote for a lane's key, with the default-listing fallback.
///
/// When the selected listing serves a header the client cannot turn into a
/// sample, one follow-up fetch without the exchange filter is attempted
/// before the tick counts as a failure.
async fn fetch_quote(context: &LaneContext) -> std::result::Result<QuoteSample, FetchError> {
    match fetch_once(context, Some(context.key.exchange_id)).await {
        Err(FetchError::InvalidResponse(reason)) => {
            debug!(
                "{}: selected listing unusable ({}), trying default listing",
                context.key, reason
            );
            fetch_once(context, None).await
        }
        other => other,
    }
}

/// One bounded fetch call. Exceeding the timeout counts as unreachable.
async fn fetch_once(
    context: &LaneContext,
    exchange_id: Option<ExchangeId>,
) -> std::result::Result<QuoteSample, FetchError> {
    match tokio::time::timeout(
        context.settings.fetch_timeout(),
        context
            .provider
            .fetch_quote(&context.key.isin, exchange_id, context.key.currency_id),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(FetchError::Unreachable(format!(
            "fetch timed out after {:?}",
            context.settings.fetch_timeout()
        ))),
    }
}
