use std::time::{Duration, Instant};

use super::format_duration;

/// Logs how long a scope took when it is dropped.
///
/// ```
/// use tickvisor::ScopedTimer;
///
/// {
///     let _timer = ScopedTimer::new("warmup");
///     // ... work ...
/// } // logs "scope finished" with timer="warmup"
/// ```
#[derive(Debug)]
#[must_use = "the timer reports when dropped; bind it to a named variable"]
pub struct ScopedTimer {
    label: String,
    started: Instant,
}

impl ScopedTimer {
    /// Starts timing a scope.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    /// Time spent in the scope so far.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        tracing::info!(
            timer = %self.label,
            duration = %format_duration(self.elapsed()),
            "scope finished"
        );
    }
}
