//! # UnitSlot: one task unit under orchestration.
//!
//! A slot owns the unit, its lifecycle state, its [`IntervalClock`] and the
//! [`EventScheduler`] that drives it when it runs on a worker thread.
//!
//! ```text
//! prepare()  : Constructed ─► Prepared           (names + starts the clock)
//! starting() : Prepared ─► Starting ─► Running    (StartupError → fault, stays Starting)
//! tick()     : Running: mark interval, repeat()
//!                Continue        → nothing
//!                Done            → logged/published once, schedule keeps firing
//!                Recoverable     → warn, RepeatFailed
//!                Unrecoverable   → fault, stop own schedule, finish()
//! finish()   : any live state ─► Finishing ─► Destroyed   (exactly once)
//! ```
//!
//! ## Rules
//! - `tick()` holds the unit lock across `repeat()` and only calls it while `Running`;
//!   `finish()` flips the state first, then takes the unit lock, so no `repeat()`
//!   starts once teardown began and an in-flight one completes before `finishing()`.
//! - `finishing()` calls of the whole fleet are serialized by the shared teardown lock.
//! - A panic inside `finishing()` is caught; the unit still reaches `Destroyed`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::{IntervalClock, format_duration};
use crate::error::{FaultKind, SchedulerError, SetupError, StartupError, UnitFault};
use crate::events::{Bus, Event, EventKind};
use crate::schedule::{EventScheduler, ScheduleState};
use crate::units::{LifecycleState, Progress, TaskUnit};

/// State shared by every slot of one orchestrator.
pub(crate) struct FleetContext {
    pub(crate) bus: Bus,
    faults: Mutex<Vec<UnitFault>>,
    teardown: Mutex<()>,
}

impl FleetContext {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            bus,
            faults: Mutex::new(Vec::new()),
            teardown: Mutex::new(()),
        }
    }

    pub(crate) fn faults(&self) -> Vec<UnitFault> {
        self.faults.lock().clone()
    }

    pub(crate) fn record(&self, fault: UnitFault) {
        self.faults.lock().push(fault);
    }
}

/// Point-in-time view of one unit, as returned by [`Orchestrator::status`](crate::Orchestrator::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    /// Unit name.
    pub name: String,
    /// Lifecycle state.
    pub state: LifecycleState,
    /// Whether the unit owns the thread that called `start()`.
    pub main_thread: bool,
    /// Completed `repeat()` invocations.
    pub repeats: u64,
    /// Recorded intervals.
    pub intervals: usize,
    /// Mean of the recorded intervals; `None` before the first tick.
    pub average_interval: Option<Duration>,
    /// Time from the start of the unit's run to its last tick.
    pub active_span: Duration,
    /// State of the unit's worker schedule (`Idle` for the main-thread unit).
    pub schedule: ScheduleState,
}

pub(crate) struct UnitSlot {
    name: Arc<str>,
    interval: Duration,
    main_thread: bool,
    unit: Mutex<Box<dyn TaskUnit>>,
    state: Mutex<LifecycleState>,
    clock: Mutex<IntervalClock>,
    scheduler: EventScheduler,
    repeats: AtomicU64,
    done_reported: AtomicBool,
    ctx: Arc<FleetContext>,
}

impl UnitSlot {
    pub(crate) fn new(
        name: Arc<str>,
        interval: Duration,
        main_thread: bool,
        unit: Box<dyn TaskUnit>,
        ctx: Arc<FleetContext>,
    ) -> Self {
        Self {
            scheduler: EventScheduler::new(format!("unit-{name}")),
            clock: Mutex::new(IntervalClock::new(name.to_string())),
            name,
            interval,
            main_thread,
            unit: Mutex::new(unit),
            state: Mutex::new(LifecycleState::Constructed),
            repeats: AtomicU64::new(0),
            done_reported: AtomicBool::new(false),
            ctx,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn runs_on_main_thread(&self) -> bool {
        self.main_thread
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub(crate) fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    /// Constructed → Prepared: names and starts the clock, then runs the unit's `prepare()`.
    pub(crate) fn prepare(&self) -> Result<(), SetupError> {
        {
            let mut clock = self.clock.lock();
            clock.set_label(self.name.to_string());
            clock.start();
        }
        self.unit.lock().prepare()?;
        self.advance(LifecycleState::Prepared);
        tracing::debug!(unit = %self.name, interval = ?self.interval, "unit prepared");
        self.publish(EventKind::UnitPrepared, |ev| ev.with_interval(self.interval));
        Ok(())
    }

    /// Prepared → Starting → Running. On failure the fault is recorded and the unit
    /// stays in `Starting`; the caller finishes it.
    pub(crate) fn starting(&self) -> Result<(), StartupError> {
        if !self.advance(LifecycleState::Starting) {
            return Err(StartupError::new(format!(
                "cannot start from state {}",
                self.state()
            )));
        }
        tracing::info!(unit = %self.name, main_thread = self.main_thread, "unit starting");
        self.publish(EventKind::UnitStarting, |ev| ev);

        let acquired = self.unit.lock().starting();
        if let Err(e) = acquired {
            self.fault(FaultKind::Startup, LifecycleState::Starting, &e.reason);
            return Err(e);
        }

        // Fresh epoch so the first interval measures cadence, not startup.
        self.clock.lock().start();
        self.advance(LifecycleState::Running);
        tracing::info!(unit = %self.name, interval = ?self.interval, "unit running");
        self.publish(EventKind::UnitRunning, |ev| ev.with_interval(self.interval));
        Ok(())
    }

    /// Hands `tick()` to the worker schedule at the unit's interval.
    pub(crate) fn schedule(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let slot = Arc::clone(self);
        self.scheduler
            .schedule_repeating(move || slot.tick(), self.interval)
    }

    /// One repeat invocation.
    pub(crate) fn tick(&self) {
        let mut unit = self.unit.lock();
        if *self.state.lock() != LifecycleState::Running {
            return;
        }
        let interval = self.clock.lock().mark_interval();
        let result = unit.repeat();
        drop(unit);
        let n = self.repeats.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(unit = %self.name, repeat = n, ?interval, "tick");

        match result {
            Ok(Progress::Continue) => {}
            Ok(Progress::Done) => {
                if !self.done_reported.swap(true, Ordering::AcqRel) {
                    tracing::info!(
                        unit = %self.name,
                        "unit reported done; schedule keeps running until the orchestrator stops it"
                    );
                    self.publish(EventKind::UnitReportedDone, |ev| ev);
                }
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(unit = %self.name, state = %LifecycleState::Running, error = %e, "repeat failed");
                self.publish(EventKind::RepeatFailed, |ev| ev.with_reason(e.to_string()));
            }
            Err(e) => {
                self.fault(FaultKind::Runtime, LifecycleState::Running, &e.to_string());
                if !self.main_thread {
                    self.scheduler.stop();
                }
                self.finish();
            }
        }
    }

    /// Records a unit-local fault: logged, stored on the fleet and published.
    pub(crate) fn fault(&self, kind: FaultKind, state: LifecycleState, reason: &str) {
        tracing::error!(unit = %self.name, %state, kind = kind.as_label(), reason, "unit fault");
        self.ctx.record(UnitFault {
            unit: self.name.to_string(),
            state,
            kind,
            reason: reason.to_string(),
        });
        let event = match kind {
            FaultKind::Startup => EventKind::UnitStartFailed,
            _ => EventKind::UnitFaulted,
        };
        self.publish(event, |ev| ev.with_state(state).with_reason(reason));
    }

    /// Runs `finishing()` and moves the unit to `Destroyed`.
    ///
    /// Returns `false` if teardown had already begun (the call is a no-op).
    pub(crate) fn finish(&self) -> bool {
        let from = {
            let mut state = self.state.lock();
            if state.is_terminating() {
                return false;
            }
            let from = *state;
            *state = LifecycleState::Finishing;
            from
        };
        self.publish(EventKind::UnitFinishing, |ev| ev);

        {
            let _order = self.ctx.teardown.lock();
            let mut unit = self.unit.lock();
            if panic::catch_unwind(AssertUnwindSafe(|| unit.finishing())).is_err() {
                tracing::error!(unit = %self.name, "finishing() panicked; continuing teardown");
            }
        }

        let (average, ticks, active, lifetime) = {
            let clock = self.clock.lock();
            (
                clock.average_interval(),
                clock.len(),
                clock.marked_span(),
                clock.elapsed_since_start(),
            )
        };
        tracing::info!(
            unit = %self.name,
            from = %from,
            ticks,
            average_interval = %average.map(format_duration).unwrap_or_else(|| "-".into()),
            active = %format_duration(active),
            duration = %format_duration(lifetime),
            "unit destroyed"
        );

        *self.state.lock() = LifecycleState::Destroyed;
        self.publish(EventKind::UnitDestroyed, |ev| match average {
            Some(avg) => ev.with_interval(avg),
            None => ev,
        });
        true
    }

    pub(crate) fn status(&self) -> UnitStatus {
        let clock = self.clock.lock();
        UnitStatus {
            name: self.name.to_string(),
            state: self.state(),
            main_thread: self.main_thread,
            repeats: self.repeats.load(Ordering::Relaxed),
            intervals: clock.len(),
            average_interval: clock.average_interval(),
            active_span: clock.marked_span(),
            schedule: self.scheduler.state(),
        }
    }

    /// Forward-only transition; illegal moves are logged and ignored.
    fn advance(&self, next: LifecycleState) -> bool {
        let mut state = self.state.lock();
        if state.can_advance_to(next) {
            *state = next;
            true
        } else {
            tracing::warn!(
                unit = %self.name,
                from = state.as_label(),
                to = next.as_label(),
                "illegal lifecycle transition ignored"
            );
            false
        }
    }

    fn publish(&self, kind: EventKind, decorate: impl FnOnce(Event) -> Event) {
        let base = Event::new(kind)
            .with_unit(Arc::clone(&self.name))
            .with_state(self.state());
        self.ctx.bus.publish(decorate(base));
    }
}
