//! Market calendar model.
//!
//! Pure data plus query functions mapping (exchange, instant) to a session
//! status. The scheduler consults this before every poll so that no network
//! call is made while an exchange is closed.
//!
//! All comparisons happen in the exchange's own timezone; callers always
//! pass UTC instants. The registry is immutable after construction and is
//! shared read-only without locking.

mod builtin;

use std::collections::HashMap;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

/// How far ahead `next_boundary` searches before giving up. Beyond this the
/// scheduler's safety ceiling governs the sleep anyway.
const BOUNDARY_HORIZON_DAYS: i64 = 14;

/// Session status of an exchange at some instant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    Open,
    Closed,
    /// The exchange has no calendar entry at all. Callers must treat this
    /// identically to `Open`: polling never silently stops on a
    /// configuration gap.
    Unknown,
}

/// A recurring trading window for one weekday.
///
/// `close <= open` denotes an overnight session that wraps into the next
/// calendar day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradingSession {
    pub weekday: Weekday,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl TradingSession {
    pub fn new(weekday: Weekday, open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            weekday,
            open,
            close,
        }
    }

    /// The same window for every weekday Monday through Friday.
    pub fn weekdays(open: NaiveTime, close: NaiveTime) -> Vec<Self> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
        .into_iter()
        .map(|weekday| Self::new(weekday, open, close))
        .collect()
    }
}

/// An exception entry for one specific date.
///
/// Exceptions take precedence over the recurring weekday sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayOverride {
    /// Full holiday; no trading that date.
    Closed,
    /// Replacement window, e.g. a half-day before a holiday.
    Window { open: NaiveTime, close: NaiveTime },
}

/// Calendar entry for a single exchange.
#[derive(Clone, Debug)]
pub struct ExchangeCalendar {
    timezone: Tz,
    sessions: Vec<TradingSession>,
    exceptions: HashMap<NaiveDate, DayOverride>,
    has_defined_hours: bool,
}

impl ExchangeCalendar {
    /// A calendar with defined trading hours.
    pub fn with_sessions(timezone: Tz, sessions: Vec<TradingSession>) -> Self {
        Self {
            timezone,
            sessions,
            exceptions: HashMap::new(),
            has_defined_hours: true,
        }
    }

    /// A calendar explicitly marked as having no defined hours.
    ///
    /// Such an exchange is always considered open for scheduling purposes;
    /// the instrument's fixed interval governs polling exclusively.
    pub fn undefined_hours(timezone: Tz) -> Self {
        Self {
            timezone,
            sessions: Vec::new(),
            exceptions: HashMap::new(),
            has_defined_hours: false,
        }
    }

    pub fn with_exception(mut self, date: NaiveDate, entry: DayOverride) -> Self {
        self.exceptions.insert(date, entry);
        self
    }

    pub fn has_defined_hours(&self) -> bool {
        self.has_defined_hours
    }

    /// Session status at a UTC instant.
    pub fn status_at(&self, instant: DateTime<Utc>) -> SessionStatus {
        if !self.has_defined_hours {
            return SessionStatus::Open;
        }

        let local = instant.with_timezone(&self.timezone).naive_local();
        let today = local.date();

        // Overnight sessions that started yesterday can still be running.
        let candidates = [today.pred_opt(), Some(today)];
        for date in candidates.into_iter().flatten() {
            for (open, close) in self.windows_for(date) {
                if open <= local && local < close {
                    return SessionStatus::Open;
                }
            }
        }
        SessionStatus::Closed
    }

    /// The next instant at which the status could change (next open or next
    /// close), or None when no boundary lies within the search horizon.
    pub fn next_boundary(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.has_defined_hours {
            return None;
        }

        let local = instant.with_timezone(&self.timezone).naive_local();
        let today = local.date();

        let mut best: Option<DateTime<Utc>> = None;
        for offset in -1..=BOUNDARY_HORIZON_DAYS {
            let date = today + Duration::days(offset);
            for (open, close) in self.windows_for(date) {
                for boundary in [open, close] {
                    if boundary <= local {
                        continue;
                    }
                    if let Some(utc) = self.local_to_utc(boundary) {
                        if best.map(|b| utc < b).unwrap_or(true) {
                            best = Some(utc);
                        }
                    }
                }
            }
        }
        best
    }

    /// Resolved trading windows for one local date, overnight wrap applied.
    fn windows_for(&self, date: NaiveDate) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        if let Some(entry) = self.exceptions.get(&date) {
            return match entry {
                DayOverride::Closed => Vec::new(),
                DayOverride::Window { open, close } => vec![wrap_window(date, *open, *close)],
            };
        }

        self.sessions
            .iter()
            .filter(|session| session.weekday == date.weekday())
            .map(|session| wrap_window(date, session.open, session.close))
            .collect()
    }

    /// Convert a local wall time to UTC, tolerating DST transitions.
    fn local_to_utc(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.timezone.from_local_datetime(&naive).earliest() {
            Some(dt) => Some(dt.with_timezone(&Utc)),
            // Spring-forward gap: the wall time does not exist; the boundary
            // effectively moves one hour later.
            None => self
                .timezone
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

fn wrap_window(date: NaiveDate, open: NaiveTime, close: NaiveTime) -> (NaiveDateTime, NaiveDateTime) {
    let open_dt = date.and_time(open);
    let close_dt = if close <= open {
        (date + Duration::days(1)).and_time(close)
    } else {
        date.and_time(close)
    };
    (open_dt, close_dt)
}

/// Immutable map of exchange code to calendar entry.
#[derive(Clone, Debug, Default)]
pub struct CalendarRegistry {
    calendars: HashMap<String, ExchangeCalendar>,
}

impl CalendarRegistry {
    /// An empty registry; every exchange is Unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in calendar table for the exchanges upstream serves.
    pub fn builtin() -> Self {
        builtin::registry()
    }

    pub fn with_calendar(mut self, code: impl Into<String>, calendar: ExchangeCalendar) -> Self {
        self.calendars.insert(code.into(), calendar);
        self
    }

    pub fn get(&self, code: &str) -> Option<&ExchangeCalendar> {
        self.calendars.get(code)
    }

    /// Session status for an exchange code at a UTC instant.
    ///
    /// Returns `Unknown` for codes without a calendar entry; callers treat
    /// that as `Open`.
    pub fn status(&self, code: &str, instant: DateTime<Utc>) -> SessionStatus {
        match self.calendars.get(code) {
            Some(calendar) => calendar.status_at(instant),
            None => SessionStatus::Unknown,
        }
    }

    /// Next boundary for an exchange code, if one is known.
    pub fn next_boundary(&self, code: &str, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.calendars
            .get(code)
            .and_then(|calendar| calendar.next_boundary(instant))
    }
}
