//! One-shot latch: threads block until it is opened; opening is permanent.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub(crate) struct Latch {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Latch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Opens the latch and releases every waiter. Idempotent.
    pub(crate) fn open(&self) {
        let mut open = self.open.lock();
        *open = true;
        self.cv.notify_all();
    }

    pub(crate) fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Blocks until the latch is open.
    pub(crate) fn wait(&self) {
        let mut open = self.open.lock();
        self.cv.wait_while(&mut open, |open| !*open);
    }

    /// Blocks until the latch is open or `timeout` passes. Returns whether it is open.
    pub(crate) fn wait_for(&self, timeout: Duration) -> bool {
        let mut open = self.open.lock();
        let _ = self.cv.wait_while_for(&mut open, |open| !*open, timeout);
        *open
    }
}
