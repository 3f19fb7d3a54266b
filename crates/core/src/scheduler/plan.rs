//! Pure tick planning.
//!
//! The decision half of the scheduler, kept free of tasks and timers so the
//! policy is directly testable: what to do on a wake, and how long to sleep
//! afterwards.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::calendar::SessionStatus;
use crate::tracker::QuoteState;

/// What a lane does on one wake.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickAction {
    /// Poll the upstream API.
    Fetch,
    /// Market closed: re-emit the last publish event, no network call.
    Republish,
}

/// Decide the action for a wake.
///
/// `Unknown` is treated identically to `Open`: polling never silently stops
/// on an ambiguous calendar. A `Pending` instrument fetches once even while
/// the market is closed, so a first value exists to publish.
pub(crate) fn plan_wake(status: SessionStatus, state: QuoteState) -> TickAction {
    match status {
        SessionStatus::Open | SessionStatus::Unknown => TickAction::Fetch,
        SessionStatus::Closed if state == QuoteState::Pending => TickAction::Fetch,
        SessionStatus::Closed => TickAction::Republish,
    }
}

/// Sleep duration for a closed market.
///
/// Sleeps to the next session boundary, but never longer than the safety
/// ceiling - a wrong or missing boundary must not sleep a lane forever.
pub(crate) fn closed_sleep(
    now: DateTime<Utc>,
    boundary: Option<DateTime<Utc>>,
    ceiling: Duration,
) -> Duration {
    boundary
        .and_then(|instant| (instant - now).to_std().ok())
        .map(|until| until.min(ceiling))
        .unwrap_or(ceiling)
}

/// Exponential backoff for the given consecutive-failure count.
///
/// `base * 2^(failures - 1)`, capped. The counter resets to zero only on the
/// next success.
pub(crate) fn backoff_delay(base: Duration, cap: Duration, failure_count: u32) -> Duration {
    if failure_count <= 1 {
        return base.min(cap);
    }
    let exponent = (failure_count - 1).min(16);
    base.saturating_mul(2u32.saturating_pow(exponent)).min(cap)
}

/// Poll interval after a successful fetch on an open market.
pub(crate) fn effective_interval(
    realtime_exchange: bool,
    realtime_interval: Duration,
    fallback_interval: Duration,
) -> Duration {
    if realtime_exchange {
        realtime_interval
    } else {
        fallback_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_open_market_fetches() {
        assert_eq!(
            plan_wake(SessionStatus::Open, QuoteState::Fresh),
            TickAction::Fetch
        );
        assert_eq!(
            plan_wake(SessionStatus::Open, QuoteState::Degraded),
            TickAction::Fetch
        );
    }

    #[test]
    fn test_unknown_treated_as_open() {
        assert_eq!(
            plan_wake(SessionStatus::Unknown, QuoteState::Fresh),
            TickAction::Fetch
        );
    }

    #[test]
    fn test_closed_market_republishes() {
        assert_eq!(
            plan_wake(SessionStatus::Closed, QuoteState::Fresh),
            TickAction::Republish
        );
        assert_eq!(
            plan_wake(SessionStatus::Closed, QuoteState::Degraded),
            TickAction::Republish
        );
    }

    #[test]
    fn test_closed_market_pending_fetches_once() {
        assert_eq!(
            plan_wake(SessionStatus::Closed, QuoteState::Pending),
            TickAction::Fetch
        );
    }

    #[test]
    fn test_closed_sleep_until_boundary() {
        // 08:00 -> 09:00 open boundary: sleep exactly one hour.
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 0).unwrap();
        let boundary = Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap();
        let ceiling = Duration::from_secs(4 * 60 * 60);
        assert_eq!(
            closed_sleep(now, Some(boundary), ceiling),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_closed_sleep_capped_by_ceiling() {
        let now = Utc.with_ymd_and_hms(2024, 3, 8, 20, 0, 0).unwrap();
        // Monday open is far beyond the ceiling.
        let boundary = Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap();
        let ceiling = Duration::from_secs(4 * 60 * 60);
        assert_eq!(closed_sleep(now, Some(boundary), ceiling), ceiling);
    }

    #[test]
    fn test_closed_sleep_without_boundary_uses_ceiling() {
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 0).unwrap();
        let ceiling = Duration::from_secs(4 * 60 * 60);
        assert_eq!(closed_sleep(now, None, ceiling), ceiling);
    }

    #[test]
    fn test_closed_sleep_past_boundary_uses_ceiling() {
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 9, 30, 0).unwrap();
        let boundary = Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap();
        let ceiling = Duration::from_secs(60);
        assert_eq!(closed_sleep(now, Some(boundary), ceiling), ceiling);
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let base = Duration::from_secs(30);
        let cap = Duration::from_secs(30 * 60);
        assert_eq!(backoff_delay(base, cap, 1), Duration::from_secs(30));
        assert_eq!(backoff_delay(base, cap, 2), Duration::from_secs(60));
        assert_eq!(backoff_delay(base, cap, 3), Duration::from_secs(120));
        assert_eq!(backoff_delay(base, cap, 4), Duration::from_secs(240));
    }

    #[test]
    fn test_backoff_never_exceeds_cap() {
        let base = Duration::from_secs(30);
        let cap = Duration::from_secs(30 * 60);
        for failures in 0..64 {
            assert!(backoff_delay(base, cap, failures) <= cap);
        }
        assert_eq!(backoff_delay(base, cap, 63), cap);
    }

    #[test]
    fn test_effective_interval() {
        let realtime = Duration::from_secs(30);
        let fallback = Duration::from_secs(300);
        assert_eq!(effective_interval(true, realtime, fallback), realtime);
        assert_eq!(effective_interval(false, realtime, fallback), fallback);
    }
}
