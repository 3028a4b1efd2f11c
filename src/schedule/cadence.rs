use std::fmt;
use std::time::Duration;

/// How a schedule fires its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Sleep `interval`, invoke, repeat until stopped.
    Repeating(Duration),
    /// Sleep `delay`, invoke once.
    OneShot(Duration),
}

impl Cadence {
    /// The sleep preceding each invocation.
    pub fn period(&self) -> Duration {
        match self {
            Cadence::Repeating(d) | Cadence::OneShot(d) => *d,
        }
    }

    /// True for [`Cadence::Repeating`].
    pub fn is_repeating(&self) -> bool {
        matches!(self, Cadence::Repeating(_))
    }
}

/// Lifecycle of a single schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// Never armed.
    Idle,
    /// The scheduling thread is sleeping or invoking the callback.
    Running,
    /// Stop was requested; no further invocation will start.
    StopRequested,
    /// The scheduling thread has exited (joined, or a one-shot fired).
    Stopped,
}

impl ScheduleState {
    /// True once a stop was requested or completed.
    pub fn is_stopping(&self) -> bool {
        matches!(self, ScheduleState::StopRequested | ScheduleState::Stopped)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleState::Idle => "idle",
            ScheduleState::Running => "running",
            ScheduleState::StopRequested => "stop_requested",
            ScheduleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
