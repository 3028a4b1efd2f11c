//! Interval and duration measurement.
//!
//! ## Contents
//! - [`IntervalClock`] start instant, last mark, append-only interval history
//! - [`format_duration`] `1h 2m 3s 4ms` rendering, largest unit first
//! - [`ScopedTimer`] logs how long a scope took when dropped

mod format;
mod interval;
mod scoped;

pub use format::format_duration;
pub use interval::IntervalClock;
pub use scoped::ScopedTimer;
