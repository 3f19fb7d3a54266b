//! Quotewatch Core - market-aware adaptive polling engine.
//!
//! Tracks security prices identified by ISIN across exchange/currency
//! listings and publishes derived values to a host platform. The engine
//! polls only while the relevant exchange is open, backs off on failures,
//! and keeps per-instrument state machines that the host observes through
//! a publication sink.
//!
//! Control flow per instrument: a scheduling lane wakes, the calendar
//! answers open/closed plus the next boundary, an open market triggers a
//! fetch through `quotewatch-market-data`, the result feeds the quote state
//! machine, and the lane computes its next wake from policy. A closed
//! market makes no network call; the last publish event is re-emitted
//! unchanged and the lane sleeps to the session boundary.

pub mod calendar;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod history;
pub mod logo;
pub mod scheduler;
pub mod tracker;

// Re-export error types
pub use errors::{Error, Result, ValidationError};

// Re-export the engine surface
pub use calendar::{CalendarRegistry, DayOverride, ExchangeCalendar, SessionStatus, TradingSession};
pub use catalog::{Catalog, CurrencyInfo, ExchangeInfo};
pub use config::{is_valid_isin, ConfigEntry, SchedulerSettings};
pub use history::{HistoryService, HistorySnapshot, HistorySource};
pub use logo::LogoService;
pub use scheduler::PollScheduler;
pub use tracker::{
    ChangeUnit, InstrumentTracker, MockPublishSink, NoOpPublishSink, PublishEvent, PublishSink,
    QuoteState,
};
