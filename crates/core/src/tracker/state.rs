//! Per-instrument quote state machine.

use log::{debug, info, warn};
use rust_decimal::Decimal;

use quotewatch_market_data::{FetchError, InstrumentKey, QuoteSample, RetryClass};

use super::{ChangeUnit, PublishEvent, PublishSink, QuoteState};

/// State machine for one tracked instrument.
///
/// Holds the current and previous sample (just enough to compute deltas -
/// never a history), counts consecutive failures, and emits a publish event
/// on every state transition and every successful sample.
///
/// Owned exclusively by the instrument's scheduling lane; no interior
/// locking is needed.
pub struct InstrumentTracker {
    key: InstrumentKey,
    degraded_threshold: u32,
    state: QuoteState,
    current: Option<QuoteSample>,
    previous: Option<QuoteSample>,
    consecutive_failures: u32,
    last_event: Option<PublishEvent>,
}

impl InstrumentTracker {
    pub fn new(key: InstrumentKey, degraded_threshold: u32) -> Self {
        Self {
            key,
            degraded_threshold: degraded_threshold.max(1),
            state: QuoteState::Pending,
            current: None,
            previous: None,
            consecutive_failures: 0,
            last_event: None,
        }
    }

    pub fn key(&self) -> &InstrumentKey {
        &self.key
    }

    pub fn state(&self) -> QuoteState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn current(&self) -> Option<&QuoteSample> {
        self.current.as_ref()
    }

    /// Apply a successful fetch.
    ///
    /// Rotates previous/current, resets the failure counter regardless of
    /// its prior value, recomputes the derived values and emits.
    pub fn record_success(&mut self, sample: QuoteSample, sink: &dyn PublishSink) {
        let old_state = self.state;
        self.previous = self.current.take();
        self.current = Some(sample);
        self.consecutive_failures = 0;
        self.state = QuoteState::Fresh;

        if old_state != self.state {
            debug!("{}: {} -> {}", self.key, old_state, self.state);
        }

        let event = self.build_event();
        self.last_event = Some(event.clone());
        sink.emit(event);
    }

    /// Apply a failed fetch.
    ///
    /// The previous sample stays untouched; only the state and failure
    /// counter move. An event is emitted only when the state actually
    /// transitions. Returns the state after the failure.
    pub fn record_failure(&mut self, error: &FetchError, sink: &dyn PublishSink) -> QuoteState {
        let old_state = self.state;

        match error.retry_class() {
            RetryClass::Never => {
                self.state = QuoteState::Suspended;
            }
            RetryClass::WithBackoff | RetryClass::AfterCooldown => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= self.degraded_threshold
                    && matches!(self.state, QuoteState::Pending | QuoteState::Fresh)
                {
                    self.state = QuoteState::Degraded;
                }
            }
        }

        if old_state != self.state {
            match self.state {
                QuoteState::Suspended => {
                    info!("{}: suspended after upstream rejection: {}", self.key, error)
                }
                QuoteState::Degraded => warn!(
                    "{}: degraded after {} consecutive failures",
                    self.key, self.consecutive_failures
                ),
                _ => {}
            }
            let event = self.build_event();
            self.last_event = Some(event.clone());
            sink.emit(event);
        }
        self.state
    }

    /// Re-emit the last publish event unchanged.
    ///
    /// Used on closed-market ticks: an idempotent re-publication, never a
    /// new computation. Nothing is emitted before the first event exists.
    pub fn republish(&self, sink: &dyn PublishSink) {
        if let Some(event) = &self.last_event {
            sink.emit(event.clone());
        }
    }

    /// Build an event from the held samples.
    ///
    /// Derived values come out of the current/previous pair; they are never
    /// recomputed against anything else.
    fn build_event(&self) -> PublishEvent {
        let (change_percent, change_absolute, change_unit) = self.derived();
        PublishEvent {
            key: self.key.clone(),
            price: self.current.as_ref().map(|s| s.price),
            currency_sign: self.current.as_ref().map(|s| s.currency_sign.clone()),
            change_percent,
            change_absolute,
            change_unit,
            state: self.state,
            retrieved_at: self.current.as_ref().map(|s| s.retrieved_at),
        }
    }

    fn derived(&self) -> (Option<Decimal>, Option<Decimal>, ChangeUnit) {
        let current = match &self.current {
            Some(sample) => sample,
            None => return (None, None, ChangeUnit::Currency),
        };
        let unit = if current.is_bond() {
            ChangeUnit::PercentagePoints
        } else {
            ChangeUnit::Currency
        };
        match &self.previous {
            Some(previous) => {
                let absolute = current.price - previous.price;
                let percent = if previous.price.is_zero() {
                    None
                } else {
                    Some(absolute / previous.price * Decimal::ONE_HUNDRED)
                };
                (percent, Some(absolute), unit)
            }
            None => (None, None, unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::MockPublishSink;
    use super::*;
    use chrono::{Duration, Utc};
    use quotewatch_market_data::AssetClass;
    use rust_decimal_macros::dec;

    fn key() -> InstrumentKey {
        InstrumentKey::new("DE0007164600", 2779, 814)
    }

    fn sample(price: Decimal) -> QuoteSample {
        QuoteSample::new(price, "€".to_string(), Utc::now())
    }

    #[test]
    fn test_first_success_pending_to_fresh() {
        let mut tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();
        assert_eq!(tracker.state(), QuoteState::Pending);

        tracker.record_success(sample(dec!(100.00)), &sink);

        assert_eq!(tracker.state(), QuoteState::Fresh);
        let event = sink.last().unwrap();
        assert_eq!(event.state, QuoteState::Fresh);
        assert_eq!(event.price, Some(dec!(100.00)));
        // No previous sample: change is unavailable, not zero.
        assert_eq!(event.change_percent, None);
        assert_eq!(event.change_absolute, None);
    }

    #[test]
    fn test_second_success_computes_changes() {
        let mut tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();

        tracker.record_success(sample(dec!(100.00)), &sink);
        tracker.record_success(sample(dec!(102.00)), &sink);

        let event = sink.last().unwrap();
        assert_eq!(event.change_percent, Some(dec!(2.0)));
        assert_eq!(event.change_absolute, Some(dec!(2.00)));
        assert_eq!(event.change_unit, ChangeUnit::Currency);
    }

    #[test]
    fn test_bond_changes_in_percentage_points() {
        let mut tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();

        let mut first = sample(dec!(99.50));
        first.asset_class = Some(AssetClass::Bond);
        let mut second = sample(dec!(99.75));
        second.asset_class = Some(AssetClass::Bond);

        tracker.record_success(first, &sink);
        tracker.record_success(second, &sink);

        let event = sink.last().unwrap();
        assert_eq!(event.change_unit, ChangeUnit::PercentagePoints);
        assert_eq!(event.change_absolute, Some(dec!(0.25)));
    }

    #[test]
    fn test_zero_previous_price_leaves_percent_unavailable() {
        let mut tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();

        tracker.record_success(sample(dec!(0)), &sink);
        tracker.record_success(sample(dec!(5.00)), &sink);

        let event = sink.last().unwrap();
        assert_eq!(event.change_percent, None);
        assert_eq!(event.change_absolute, Some(dec!(5.00)));
    }

    #[test]
    fn test_degraded_after_threshold_then_recovers() {
        let mut tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();
        let error = FetchError::Unreachable("connection reset".to_string());

        tracker.record_success(sample(dec!(100.00)), &sink);
        sink.clear();

        assert_eq!(tracker.record_failure(&error, &sink), QuoteState::Fresh);
        assert_eq!(tracker.record_failure(&error, &sink), QuoteState::Fresh);
        assert!(sink.is_empty(), "no event before the threshold is crossed");

        assert_eq!(tracker.record_failure(&error, &sink), QuoteState::Degraded);
        assert_eq!(sink.len(), 1);
        let event = sink.last().unwrap();
        assert_eq!(event.state, QuoteState::Degraded);
        // Stale values are carried, not recomputed.
        assert_eq!(event.price, Some(dec!(100.00)));

        // Any success resets the counter and returns to Fresh.
        tracker.record_success(sample(dec!(101.00)), &sink);
        assert_eq!(tracker.state(), QuoteState::Fresh);
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn test_failure_counter_resets_on_success() {
        let mut tracker = InstrumentTracker::new(key(), 5);
        let sink = MockPublishSink::new();
        let error = FetchError::InvalidResponse("garbage".to_string());

        for _ in 0..4 {
            tracker.record_failure(&error, &sink);
        }
        assert_eq!(tracker.consecutive_failures(), 4);

        tracker.record_success(sample(dec!(10.00)), &sink);
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn test_not_found_suspends_from_any_state() {
        let error = FetchError::NotFound("DE0007164600".to_string());

        let mut pending = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();
        assert_eq!(pending.record_failure(&error, &sink), QuoteState::Suspended);
        let event = sink.last().unwrap();
        assert_eq!(event.state, QuoteState::Suspended);
        assert_eq!(event.price, None);

        let mut fresh = InstrumentTracker::new(key(), 3);
        fresh.record_success(sample(dec!(50.00)), &sink);
        assert_eq!(fresh.record_failure(&error, &sink), QuoteState::Suspended);

        // No automatic way out of Suspended.
        let retryable = FetchError::Unreachable("x".to_string());
        assert_eq!(fresh.record_failure(&retryable, &sink), QuoteState::Suspended);
    }

    #[test]
    fn test_republish_is_idempotent() {
        let mut tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();

        tracker.record_success(sample(dec!(100.00)), &sink);
        tracker.record_success(sample(dec!(102.00)), &sink);
        let before = sink.last().unwrap();

        tracker.republish(&sink);
        tracker.republish(&sink);

        let events = sink.events();
        assert_eq!(events.len(), 4);
        // Re-published events are byte-for-byte the prior event: same
        // derived values, same retrieved_at.
        assert_eq!(events[2], before);
        assert_eq!(events[3], before);
    }

    #[test]
    fn test_republish_without_any_event_emits_nothing() {
        let tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();
        tracker.republish(&sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_retrieved_at_monotonic_across_successes() {
        let mut tracker = InstrumentTracker::new(key(), 3);
        let sink = MockPublishSink::new();

        let t0 = Utc::now();
        let mut first = sample(dec!(1.00));
        first.retrieved_at = t0;
        let mut second = sample(dec!(2.00));
        second.retrieved_at = t0 + Duration::seconds(30);

        tracker.record_success(first, &sink);
        tracker.record_success(second, &sink);
        tracker.republish(&sink);

        let stamps: Vec<_> = sink
            .events()
            .iter()
            .filter_map(|e| e.retrieved_at)
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }
}
