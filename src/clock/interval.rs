//! # IntervalClock: elapsed time and per-call intervals.
//!
//! A clock has a *measurement epoch* opened by [`IntervalClock::start`] and a
//! *last mark* advanced by [`IntervalClock::mark_interval`]. Every mark appends
//! the time since the previous mark to an append-only history.
//!
//! ```text
//! start()          mark_interval()   mark_interval()
//!   │◄──── d1 ────────►│◄──── d2 ───────►│
//!   started            last_mark          last_mark
//!
//! intervals = [d1, d2]    average = (d1 + d2) / 2
//! ```
//!
//! ## Rules
//! - History is **append-only**; only [`IntervalClock::reset`] clears it.
//! - [`IntervalClock::start`] opens a new epoch but **keeps** the history, so
//!   averages stay cumulative across restarts of the same clock.
//! - [`IntervalClock::average_interval`] is computed over the full history at
//!   query time (no decay) and is `None` when nothing was recorded.

use std::time::{Duration, Instant};

/// Measures elapsed durations and the interval between successive marks.
#[derive(Debug, Clone)]
pub struct IntervalClock {
    label: String,
    started: Instant,
    last_mark: Instant,
    intervals: Vec<Duration>,
}

impl IntervalClock {
    /// Creates a clock whose epoch starts now.
    pub fn new(label: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            label: label.into(),
            started: now,
            last_mark: now,
            intervals: Vec::new(),
        }
    }

    /// Name used when the clock is reported in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Renames the clock.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Opens a fresh measurement epoch: start and last mark both become "now".
    ///
    /// Recorded intervals are kept; call [`IntervalClock::reset`] first to
    /// average over the new epoch only.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.started = now;
        self.last_mark = now;
    }

    /// Clears the recorded history and opens a fresh epoch.
    pub fn reset(&mut self) {
        self.intervals.clear();
        self.start();
    }

    /// Records the time since the previous mark and returns it.
    pub fn mark_interval(&mut self) -> Duration {
        let now = Instant::now();
        let interval = now.saturating_duration_since(self.last_mark);
        self.intervals.push(interval);
        self.last_mark = now;
        interval
    }

    /// Time since the epoch was opened.
    pub fn elapsed_since_start(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time since the last mark (or since the epoch, if nothing was marked yet).
    pub fn elapsed_since_last_mark(&self) -> Duration {
        self.last_mark.elapsed()
    }

    /// Span between the epoch and the last mark.
    pub fn marked_span(&self) -> Duration {
        self.last_mark.saturating_duration_since(self.started)
    }

    /// Arithmetic mean of all recorded intervals, or `None` for an empty history.
    ///
    /// # Example
    /// ```
    /// use tickvisor::IntervalClock;
    ///
    /// let clock = IntervalClock::new("idle");
    /// assert_eq!(clock.average_interval(), None);
    /// ```
    pub fn average_interval(&self) -> Option<Duration> {
        if self.intervals.is_empty() {
            return None;
        }
        let total: u128 = self.intervals.iter().map(Duration::as_nanos).sum();
        let mean = total / self.intervals.len() as u128;
        Some(Duration::from_nanos(
            mean.min(u128::from(u64::MAX)) as u64,
        ))
    }

    /// Recorded intervals, oldest first.
    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }

    /// Most recent interval, if any.
    pub fn last_interval(&self) -> Option<Duration> {
        self.intervals.last().copied()
    }

    /// Number of recorded intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// True if no interval was recorded.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn record(&mut self, interval: Duration) {
        self.intervals.push(interval);
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::new("clock")
    }
}
