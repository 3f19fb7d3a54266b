//! Built-in calendar table.
//!
//! Covers the exchanges the upstream API serves. Entries use the upstream
//! exchange codes; hours are regular sessions without exchange holidays -
//! ad-hoc closures degrade to "treated as open" and are healed by the
//! scheduler's backoff rather than a stale table causing a crash.

use chrono::NaiveTime;
use chrono_tz::{America, Europe, Tz};

use super::{CalendarRegistry, ExchangeCalendar, TradingSession};

fn weekdays(tz: Tz, open: (u32, u32), close: (u32, u32)) -> ExchangeCalendar {
    let open = NaiveTime::from_hms_opt(open.0, open.1, 0).expect("static table time");
    let close = NaiveTime::from_hms_opt(close.0, close.1, 0).expect("static table time");
    ExchangeCalendar::with_sessions(tz, TradingSession::weekdays(open, close))
}

pub(super) fn registry() -> CalendarRegistry {
    CalendarRegistry::new()
        // German venues
        .with_calendar("TGT", weekdays(Europe::Berlin, (8, 0), (22, 0)))
        .with_calendar("FRA", weekdays(Europe::Berlin, (8, 0), (22, 0)))
        .with_calendar("STU", weekdays(Europe::Berlin, (8, 0), (22, 0)))
        .with_calendar("DUS", weekdays(Europe::Berlin, (8, 0), (20, 0)))
        .with_calendar("ETR", weekdays(Europe::Berlin, (9, 0), (17, 30)))
        .with_calendar("MUC", weekdays(Europe::Berlin, (8, 0), (22, 0)))
        .with_calendar("BEB", weekdays(Europe::Berlin, (8, 0), (20, 0)))
        .with_calendar("HAM", weekdays(Europe::Berlin, (8, 0), (22, 0)))
        .with_calendar("HAJ", weekdays(Europe::Berlin, (8, 0), (22, 0)))
        // US venues (upstream codes)
        .with_calendar("UTC", weekdays(America::New_York, (9, 30), (16, 0)))
        .with_calendar("USC", weekdays(America::New_York, (9, 30), (16, 0)))
}
