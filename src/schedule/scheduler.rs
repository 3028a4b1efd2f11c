//! # EventScheduler: one thread per schedule, blocking cancellation.
//!
//! [`EventScheduler`] fires a callback on a dedicated thread, either repeatedly at a
//! fixed cadence ([`EventScheduler::schedule_repeating`]) or once after a delay
//! ([`EventScheduler::schedule_delayed`]).
//!
//! ## Thread loop
//! ```text
//! Repeating(interval):                 OneShot(delay):
//!   loop {                               if stop requested → exit
//!     if stop requested → exit           sleep(delay)   (woken early by stop)
//!     sleep(interval) (woken by stop)    if stop requested → exit
//!     if stop requested → exit           callback()
//!     callback()                         state = Stopped
//!   }
//! ```
//!
//! ## Rules
//! - **At most one live thread** per scheduler. Arming a scheduler that still owns a
//!   live thread is rejected with [`SchedulerError::AlreadyActive`]; call
//!   [`EventScheduler::stop`] first.
//! - **No invocation starts after a stop request**; an invocation already in flight
//!   is allowed to complete (stop never interrupts a running callback).
//! - `stop()` **joins** the thread and always leaves the state at
//!   [`ScheduleState::Stopped`]. It is idempotent and safe on a never-armed scheduler.
//! - The join handle is always retained; dropping the scheduler stops and joins it.
//! - A panicking callback ends the thread. [`EventScheduler::is_active`] then turns
//!   `false` while the state still reads `Running`; owners use that divergence to
//!   detect a dead schedule.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use tickvisor::EventScheduler;
//!
//! let ticks = Arc::new(AtomicU32::new(0));
//! let scheduler = EventScheduler::new("ticker");
//! {
//!     let ticks = Arc::clone(&ticks);
//!     scheduler
//!         .schedule_repeating(move || { ticks.fetch_add(1, Ordering::Relaxed); }, Duration::from_millis(10))
//!         .unwrap();
//! }
//! std::thread::sleep(Duration::from_millis(55));
//! scheduler.stop();
//! let seen = ticks.load(Ordering::Relaxed);
//! std::thread::sleep(Duration::from_millis(30));
//! assert_eq!(ticks.load(Ordering::Relaxed), seen);
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use super::signal::StopSignal;
use super::{Cadence, ScheduleState};
use crate::error::SchedulerError;

/// Thread-backed repeating or one-shot timer.
pub struct EventScheduler {
    label: Arc<str>,
    slot: Mutex<Slot>,
    /// Serializes concurrent `stop()` callers so none returns before the join completes.
    stop_gate: Mutex<()>,
}

/// The currently (or most recently) armed schedule.
struct Slot {
    signal: Arc<StopSignal>,
    cadence: Option<Cadence>,
    handle: Option<JoinHandle<()>>,
    owner: Option<ThreadId>,
}

impl EventScheduler {
    /// Creates an idle scheduler. The label names its thread and appears in logs.
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
            slot: Mutex::new(Slot {
                signal: Arc::new(StopSignal::new(ScheduleState::Idle)),
                cadence: None,
                handle: None,
                owner: None,
            }),
            stop_gate: Mutex::new(()),
        }
    }

    /// Scheduler label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Invokes `callback` every `interval` on a new thread until stopped.
    ///
    /// The first invocation happens after one full interval. Invocations are
    /// strictly sequential; the next sleep starts when the callback returns.
    ///
    /// ### Precondition
    /// The scheduler must not own a live thread. Call [`EventScheduler::stop`] before
    /// re-arming; otherwise [`SchedulerError::AlreadyActive`] is returned.
    pub fn schedule_repeating<F>(&self, mut callback: F, interval: Duration) -> Result<(), SchedulerError>
    where
        F: FnMut() + Send + 'static,
    {
        self.arm(Cadence::Repeating(interval), move |signal| {
            while signal.sleep(interval) {
                callback();
            }
        })
    }

    /// Invokes `callback` exactly once after `delay`, unless stopped first.
    ///
    /// Same precondition as [`EventScheduler::schedule_repeating`].
    pub fn schedule_delayed<F>(&self, callback: F, delay: Duration) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm(Cadence::OneShot(delay), move |signal| {
            if signal.sleep(delay) {
                callback();
            }
            signal.mark_stopped();
        })
    }

    fn arm<B>(&self, cadence: Cadence, body: B) -> Result<(), SchedulerError>
    where
        B: FnOnce(Arc<StopSignal>) + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if slot.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(SchedulerError::AlreadyActive {
                label: self.label.to_string(),
            });
        }
        if let Some(finished) = slot.handle.take() {
            self.reap(finished);
        }

        let signal = Arc::new(StopSignal::new(ScheduleState::Running));
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name(self.label.to_string())
            .spawn(move || body(thread_signal))
            .map_err(|source| SchedulerError::Spawn {
                label: self.label.to_string(),
                source,
            })?;

        tracing::debug!(scheduler = %self.label, ?cadence, "schedule armed");
        slot.owner = Some(handle.thread().id());
        slot.handle = Some(handle);
        slot.signal = signal;
        slot.cadence = Some(cadence);
        Ok(())
    }

    /// Requests a stop and blocks until the scheduling thread has exited.
    ///
    /// Idempotent: on a stopped or never-armed scheduler it returns immediately.
    ///
    /// When called from the scheduling thread itself (from inside the callback),
    /// the join is skipped: the stop is recorded, no further invocation starts,
    /// and the thread exits once the callback returns. The state then reads
    /// [`ScheduleState::StopRequested`] until an outside caller joins.
    pub fn stop(&self) {
        let current = thread::current().id();
        {
            let slot = self.slot.lock();
            if slot.owner == Some(current) {
                slot.signal.request_stop();
                tracing::trace!(scheduler = %self.label, "stop requested from own thread");
                return;
            }
        }

        let _gate = self.stop_gate.lock();
        let (signal, handle) = {
            let mut slot = self.slot.lock();
            (Arc::clone(&slot.signal), slot.handle.take())
        };

        signal.request_stop();
        if let Some(handle) = handle {
            self.reap(handle);
            tracing::debug!(scheduler = %self.label, "schedule stopped");
        }
        signal.mark_stopped();
    }

    /// True while the scheduling thread is alive.
    pub fn is_active(&self) -> bool {
        self.slot
            .lock()
            .handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// State of the current (or most recent) schedule.
    pub fn state(&self) -> ScheduleState {
        self.slot.lock().signal.state()
    }

    /// Cadence of the current (or most recent) schedule.
    pub fn cadence(&self) -> Option<Cadence> {
        self.slot.lock().cadence
    }

    /// True when called from inside this scheduler's callback.
    pub(crate) fn on_own_thread(&self) -> bool {
        self.slot.lock().owner == Some(thread::current().id())
    }

    fn reap(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            tracing::warn!(scheduler = %self.label, "schedule thread terminated by a panic");
        }
    }
}

impl Drop for EventScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventScheduler")
            .field("label", &self.label)
            .field("state", &self.state())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Instant;

    fn counter() -> (Arc<AtomicU32>, impl FnMut() + Send + 'static) {
        let n = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&n);
        (n, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_repeating_invocations_within_tolerance() {
        let (n, cb) = counter();
        let scheduler = EventScheduler::new("repeat");
        scheduler
            .schedule_repeating(cb, Duration::from_millis(50))
            .unwrap();
        assert!(scheduler.is_active());
        assert_eq!(scheduler.state(), ScheduleState::Running);
        assert_eq!(
            scheduler.cadence(),
            Some(Cadence::Repeating(Duration::from_millis(50)))
        );

        // k = 6 intervals
        thread::sleep(Duration::from_millis(325));
        scheduler.stop();
        let seen = n.load(Ordering::SeqCst);
        assert!((5..=7).contains(&seen), "seen={seen}");

        thread::sleep(Duration::from_millis(120));
        assert_eq!(n.load(Ordering::SeqCst), seen, "invoked after stop returned");
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.state(), ScheduleState::Stopped);
    }

    #[test]
    fn test_stop_is_idempotent_and_safe_when_idle() {
        let scheduler = EventScheduler::new("idle");
        scheduler.stop();
        assert_eq!(scheduler.state(), ScheduleState::Stopped);
        assert!(!scheduler.is_active());

        let (_n, cb) = counter();
        scheduler
            .schedule_repeating(cb, Duration::from_millis(10))
            .unwrap();
        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), ScheduleState::Stopped);
        assert!(!scheduler.is_active());
    }

    #[test]
    fn test_stop_wakes_a_long_sleep() {
        let (n, cb) = counter();
        let scheduler = EventScheduler::new("long");
        scheduler.schedule_repeating(cb, Duration::from_secs(30)).unwrap();
        thread::sleep(Duration::from_millis(20));

        let t0 = Instant::now();
        scheduler.stop();
        assert!(t0.elapsed() < Duration::from_secs(5));
        assert_eq!(n.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_waits_for_in_flight_callback() {
        let finished = Arc::new(AtomicBool::new(false));
        let scheduler = EventScheduler::new("slow");
        {
            let finished = Arc::clone(&finished);
            scheduler
                .schedule_repeating(
                    move || {
                        thread::sleep(Duration::from_millis(80));
                        finished.store(true, Ordering::SeqCst);
                    },
                    Duration::from_millis(5),
                )
                .unwrap();
        }
        thread::sleep(Duration::from_millis(30));
        scheduler.stop();
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_delayed_fires_once() {
        let (n, cb) = counter();
        let scheduler = EventScheduler::new("once");
        scheduler.schedule_delayed(cb, Duration::from_millis(20)).unwrap();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(n.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.state(), ScheduleState::Stopped);
        scheduler.stop();
        assert_eq!(n.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delayed_stopped_before_firing_never_fires() {
        let (n, cb) = counter();
        let scheduler = EventScheduler::new("cancelled");
        scheduler.schedule_delayed(cb, Duration::from_millis(200)).unwrap();
        scheduler.stop();
        thread::sleep(Duration::from_millis(250));
        assert_eq!(n.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rearming_a_live_scheduler_is_rejected() {
        let (_a, cb_a) = counter();
        let (_b, cb_b) = counter();
        let scheduler = EventScheduler::new("busy");
        scheduler.schedule_repeating(cb_a, Duration::from_millis(10)).unwrap();

        let err = scheduler
            .schedule_repeating(cb_b, Duration::from_millis(10))
            .unwrap_err();
        assert_eq!(err.as_label(), "scheduler_already_active");

        scheduler.stop();
        let (b, cb_b) = counter();
        scheduler.schedule_repeating(cb_b, Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(60));
        scheduler.stop();
        assert!(b.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_panicking_callback_is_detected_via_is_active() {
        let scheduler = EventScheduler::new("doomed");
        scheduler
            .schedule_repeating(|| panic!("callback blew up"), Duration::from_millis(5))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while scheduler.is_active() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.state(), ScheduleState::Running);

        scheduler.stop();
        assert_eq!(scheduler.state(), ScheduleState::Stopped);
    }

    #[test]
    fn test_stop_from_own_callback_does_not_deadlock() {
        let (n, mut cb) = counter();
        let scheduler = Arc::new(EventScheduler::new("self-stop"));
        {
            let me = Arc::clone(&scheduler);
            scheduler
                .schedule_repeating(
                    move || {
                        cb();
                        me.stop();
                    },
                    Duration::from_millis(5),
                )
                .unwrap();
        }
        thread::sleep(Duration::from_millis(80));
        assert_eq!(n.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_active());
        scheduler.stop();
        assert_eq!(scheduler.state(), ScheduleState::Stopped);
    }

    #[test]
    fn test_concurrent_stops_both_return_after_join() {
        let scheduler = Arc::new(EventScheduler::new("racy"));
        scheduler
            .schedule_repeating(
                || thread::sleep(Duration::from_millis(40)),
                Duration::from_millis(1),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(10));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let s = Arc::clone(&scheduler);
                thread::spawn(move || {
                    s.stop();
                    (s.is_active(), s.state())
                })
            })
            .collect();
        for h in handles {
            let (active, state) = h.join().unwrap();
            assert!(!active);
            assert_eq!(state, ScheduleState::Stopped);
        }
    }
}
