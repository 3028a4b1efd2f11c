//! Per-run stop flag with an interruptible sleep.
//!
//! One [`StopSignal`] is created each time a schedule is armed and shared between
//! the owner and the scheduling thread. A stop request wakes a sleeping thread
//! immediately instead of letting it oversleep the interval.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::ScheduleState;

pub(crate) struct StopSignal {
    state: Mutex<ScheduleState>,
    wake: Condvar,
}

impl StopSignal {
    pub(crate) fn new(state: ScheduleState) -> Self {
        Self {
            state: Mutex::new(state),
            wake: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> ScheduleState {
        *self.state.lock()
    }

    /// Moves `Running` to `StopRequested` and `Idle` straight to `Stopped`, then wakes the sleeper.
    pub(crate) fn request_stop(&self) {
        let mut state = self.state.lock();
        *state = match *state {
            ScheduleState::Running => ScheduleState::StopRequested,
            ScheduleState::Idle => ScheduleState::Stopped,
            other => other,
        };
        self.wake.notify_all();
    }

    pub(crate) fn mark_stopped(&self) {
        *self.state.lock() = ScheduleState::Stopped;
        self.wake.notify_all();
    }

    /// Sleeps for `period` unless a stop is requested.
    ///
    /// Checks the flag before sleeping and after waking. Returns `true` if the
    /// caller may invoke its callback.
    pub(crate) fn sleep(&self, period: Duration) -> bool {
        let mut state = self.state.lock();
        if state.is_stopping() {
            return false;
        }
        if !period.is_zero() {
            let _ = self
                .wake
                .wait_while_for(&mut state, |s| !s.is_stopping(), period);
        }
        !state.is_stopping()
    }
}
