//! # Orchestrator: owns a fleet of task units and drives start/stop.
//!
//! The [`Orchestrator`] constructs units from their [`UnitSpec`]s, starts them on
//! the right thread, and tears them down in reverse order when a stop arrives
//! from a signal, the auto-shutdown timer, or the owner.
//!
//! ## Architecture
//! ```text
//! instantiate():  factory() → prepare()   for each spec, in order   (SetupError aborts all)
//!
//! start() on thread T:
//!   ├─► health watchdog      (EventScheduler, repeating, check_health)
//!   ├─► auto-shutdown timer  (EventScheduler, one-shot, stop(Timeout))
//!   ├─► signal watcher       (thread, stop(Signal))
//!   ├─► worker units, in order:  starting() → EventScheduler::schedule_repeating(tick)
//!   └─► main-thread unit (last): starting() → loop { sleep; tick } on T → finishing() on T
//!
//! stop(source):   Idle|Running ─CAS─► Stopping   (losers return false)
//!   ├─► cancel token, wake the main loop
//!   ├─► stop watchdog + timer
//!   ├─► EventScheduler::stop() per worker, last-started first   (joins)
//!   ├─► main-thread unit finishes on T, after the joins
//!   ├─► finishing() per remaining unit, reverse start order     (sequential)
//!   └─► Stopped, AllStopped
//! ```
//!
//! ## Rules
//! - `stop()` is idempotent: exactly one call wins and performs the teardown.
//! - The winning `stop()` does not return while any worker schedule thread is alive.
//! - The main-thread unit is finished only after every worker schedule thread was joined.
//! - A `stop()` issued from the thread running `start()` or `instantiate()` (for
//!   example from the main-thread unit's `repeat()`) only requests the stop; the
//!   teardown runs on that thread once the call unwinds out of its loop.
//! - A `stop()` issued from a unit's worker thread or from a subscriber hands
//!   the teardown to a dedicated thread, since it would have to join its caller.
//! - Unit-local failures (startup, unrecoverable repeat, dead schedule thread)
//!   finish only that unit and are recorded in [`Orchestrator::faults`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::{fmt, mem};

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::builder::OrchestratorBuilder;
use super::latch::Latch;
use super::shutdown::spawn_signal_watcher;
use super::slot::{FleetContext, UnitSlot, UnitStatus};
use super::OrchestratorConfig;
use crate::error::{FaultKind, OrchestratorError, SetupError, UnitFault};
use crate::events::{Bus, Event, EventKind, StopSource};
use crate::schedule::{EventScheduler, ScheduleState};
use crate::units::{LifecycleState, UnitSpec};

/// Fleet-level run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    /// Built or instantiated, not started.
    Idle = 0,
    /// `start()` succeeded.
    Running = 1,
    /// A stop won the race; teardown in progress.
    Stopping = 2,
    /// Every unit is destroyed.
    Stopped = 3,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RunState::Idle,
            1 => RunState::Running,
            2 => RunState::Stopping,
            _ => RunState::Stopped,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Owns a fleet of task units and coordinates their lifecycle.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tickvisor::{Orchestrator, OrchestratorConfig, Progress, UnitFn, UnitSpec};
///
/// let cfg = OrchestratorConfig {
///     auto_shutdown: Duration::from_millis(120),
///     handle_signals: false,
///     ..OrchestratorConfig::default()
/// };
/// let orch = Orchestrator::builder(cfg)
///     .with_unit(UnitSpec::new("ticker", Duration::from_millis(20), || {
///         Ok(UnitFn::boxed(|| Ok(Progress::Continue)))
///     }))
///     .build();
///
/// orch.instantiate().unwrap();
/// orch.run().unwrap(); // returns once the auto-shutdown timer stopped the fleet
/// assert_eq!(orch.run_state(), tickvisor::RunState::Stopped);
/// ```
pub struct Orchestrator {
    cfg: OrchestratorConfig,
    ctx: Arc<FleetContext>,
    specs: Mutex<Vec<UnitSpec>>,
    slots: RwLock<Vec<Arc<UnitSlot>>>,
    instantiated: AtomicBool,
    run_state: AtomicU8,
    token: CancellationToken,

    /// Wakes the main-thread loop out of its sleep.
    wake: Latch,
    /// Opened by teardown once every worker schedule thread has been joined.
    workers_joined: Latch,
    /// Opened once the main-thread unit left its loop (and finished, unless teardown runs on its thread).
    main_done: Latch,
    stopped: Latch,

    /// Held while `instantiate()` builds or `start()` launches units; teardown waits for it.
    launch: Mutex<()>,
    /// Thread currently inside `start()`.
    caller: Mutex<Option<ThreadId>>,
    main_claimed: AtomicBool,
    deferred_teardown: AtomicBool,

    watchdog: EventScheduler,
    auto_stop: EventScheduler,
    signal_watcher: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    /// Subscriber worker threads; teardown never runs inline on one of them.
    subscriber_threads: Vec<ThreadId>,
    this: Weak<Orchestrator>,
}

impl Orchestrator {
    /// Returns a builder for a new orchestrator.
    pub fn builder(cfg: OrchestratorConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: OrchestratorConfig,
        bus: Bus,
        specs: Vec<UnitSpec>,
        listener: Option<JoinHandle<()>>,
        subscriber_threads: Vec<ThreadId>,
        this: Weak<Orchestrator>,
    ) -> Self {
        Self {
            cfg,
            ctx: Arc::new(FleetContext::new(bus)),
            specs: Mutex::new(specs),
            slots: RwLock::new(Vec::new()),
            instantiated: AtomicBool::new(false),
            run_state: AtomicU8::new(RunState::Idle as u8),
            token: CancellationToken::new(),
            wake: Latch::new(),
            workers_joined: Latch::new(),
            main_done: Latch::new(),
            stopped: Latch::new(),
            launch: Mutex::new(()),
            caller: Mutex::new(None),
            main_claimed: AtomicBool::new(false),
            deferred_teardown: AtomicBool::new(false),
            watchdog: EventScheduler::new("tickvisor-watchdog"),
            auto_stop: EventScheduler::new("tickvisor-auto-shutdown"),
            signal_watcher: Mutex::new(None),
            listener: Mutex::new(listener),
            subscriber_threads,
            this,
        }
    }

    /// Constructs every unit and calls `prepare()` on each, in insertion order.
    ///
    /// Any [`SetupError`] (from a factory or from `prepare()`) aborts the whole
    /// fleet: units built so far are finished in reverse order, the orchestrator
    /// moves to [`RunState::Stopped`] and [`OrchestratorError::Setup`] is returned.
    ///
    /// Once the orchestrator has been stopped no unit is built any more and
    /// [`OrchestratorError::AlreadyStarted`] is returned.
    pub fn instantiate(&self) -> Result<(), OrchestratorError> {
        let result = {
            let _launch = self.launch.lock();
            *self.caller.lock() = Some(thread::current().id());
            let result = self.build_fleet();
            *self.caller.lock() = None;
            result
        };
        if self.deferred_teardown.swap(false, Ordering::AcqRel) {
            self.teardown();
        }
        result
    }

    fn build_fleet(&self) -> Result<(), OrchestratorError> {
        if self.run_state() != RunState::Idle {
            return Err(OrchestratorError::AlreadyStarted);
        }
        if self.instantiated.swap(true, Ordering::AcqRel) {
            return Err(OrchestratorError::AlreadyInstantiated);
        }
        let specs = mem::take(&mut *self.specs.lock());
        let mut built: Vec<Arc<UnitSlot>> = Vec::with_capacity(specs.len());

        for spec in specs {
            let (name, interval, main_thread, factory) = spec.into_parts();
            let unit = match factory() {
                Ok(unit) => unit,
                Err(source) => {
                    let state = LifecycleState::Constructed;
                    tracing::error!(unit = %name, %state, error = %source, "unit construction failed");
                    self.ctx.record(UnitFault {
                        unit: name.to_string(),
                        state,
                        kind: FaultKind::Setup,
                        reason: source.reason.clone(),
                    });
                    return Err(self.abort_instantiate(&built, &name, state, source));
                }
            };

            let slot = Arc::new(UnitSlot::new(
                Arc::clone(&name),
                interval,
                main_thread,
                unit,
                Arc::clone(&self.ctx),
            ));
            let prepared = slot.prepare();
            built.push(Arc::clone(&slot));
            if let Err(source) = prepared {
                let state = slot.state();
                slot.fault(FaultKind::Setup, state, &source.reason);
                return Err(self.abort_instantiate(&built, &name, state, source));
            }
        }

        tracing::info!(units = built.len(), "fleet instantiated");
        *self.slots.write() = built;
        Ok(())
    }

    fn abort_instantiate(
        &self,
        built: &[Arc<UnitSlot>],
        unit: &str,
        state: LifecycleState,
        source: SetupError,
    ) -> OrchestratorError {
        tracing::error!(unit, %state, "instantiation aborted; tearing down {} unit(s)", built.len());
        // A stop that won meanwhile runs its own teardown once the launch lock is released.
        let owns_teardown = self.transition(RunState::Idle, RunState::Stopping);
        self.token.cancel();
        for slot in built.iter().rev() {
            slot.finish();
        }
        if owns_teardown {
            self.finalize();
        }
        OrchestratorError::Setup {
            unit: unit.to_string(),
            state,
            source,
        }
    }

    /// Starts the fleet on the calling thread.
    ///
    /// Worker units are started in insertion order and handed to their own
    /// schedule; a unit whose `starting()` fails is finished immediately and the
    /// others are unaffected. If a unit requires the main thread it is started
    /// last and runs on the calling thread: `start()` then blocks until the
    /// whole fleet is stopped. Without such a unit `start()` returns once the
    /// workers are launched; use [`Orchestrator::wait`] or [`Orchestrator::run`].
    ///
    /// ### Errors
    /// - [`OrchestratorError::NotInstantiated`] before `instantiate()`.
    /// - [`OrchestratorError::MultipleMainThreadUnits`] if two units claim the main thread.
    /// - [`OrchestratorError::AlreadyStarted`] on a second call, or after a stop.
    /// - [`OrchestratorError::Scheduler`] / [`OrchestratorError::Signal`] if the
    ///   watchdog, timer or signal watcher cannot be installed (the fleet is stopped).
    pub fn start(&self) -> Result<(), OrchestratorError> {
        if !self.instantiated.load(Ordering::Acquire) {
            return Err(OrchestratorError::NotInstantiated);
        }
        let slots = self.slots.read().clone();
        let mut mains = slots.iter().filter(|s| s.runs_on_main_thread());
        let main = mains.next().cloned();
        if let (Some(first), Some(second)) = (&main, mains.next()) {
            tracing::error!(first = first.name(), second = second.name(), "two units require the main thread");
            return Err(OrchestratorError::MultipleMainThreadUnits {
                first: first.name().to_string(),
                second: second.name().to_string(),
            });
        }

        if let Err(e) = self.launch_workers(&slots, main.is_some()) {
            if matches!(e, OrchestratorError::AlreadyStarted) {
                return Err(e);
            }
            tracing::error!(error = %e, "orchestrator start aborted");
            *self.caller.lock() = None;
            self.main_claimed.store(false, Ordering::Release);
            if !self.stop(StopSource::Manual) && self.deferred_teardown.swap(false, Ordering::AcqRel) {
                self.teardown();
            }
            return Err(e);
        }

        if let Some(slot) = &main {
            self.run_main(slot);
        }

        *self.caller.lock() = None;
        if self.deferred_teardown.swap(false, Ordering::AcqRel) {
            self.teardown();
        }
        if main.is_some() {
            self.stopped.wait();
        }
        Ok(())
    }

    fn launch_workers(&self, slots: &[Arc<UnitSlot>], has_main: bool) -> Result<(), OrchestratorError> {
        let _launch = self.launch.lock();
        if !self.transition(RunState::Idle, RunState::Running) {
            return Err(OrchestratorError::AlreadyStarted);
        }
        *self.caller.lock() = Some(thread::current().id());
        self.main_claimed.store(has_main, Ordering::Release);
        tracing::info!(units = slots.len(), main_thread = has_main, "orchestrator starting");

        self.arm_timers()?;

        for slot in slots.iter().filter(|s| !s.runs_on_main_thread()) {
            if self.token.is_cancelled() {
                break;
            }
            if slot.starting().is_err() {
                slot.finish();
                continue;
            }
            if let Err(e) = slot.schedule() {
                slot.fault(FaultKind::SchedulerFault, slot.state(), &e.to_string());
                slot.finish();
            }
        }
        Ok(())
    }

    fn arm_timers(&self) -> Result<(), OrchestratorError> {
        if let Some(every) = self.cfg.health_check_interval() {
            let this = self.this.clone();
            self.watchdog.schedule_repeating(
                move || {
                    if let Some(orch) = this.upgrade() {
                        orch.check_health();
                    }
                },
                every,
            )?;
        }

        if let Some(after) = self.cfg.auto_shutdown_after() {
            let this = self.this.clone();
            self.auto_stop.schedule_delayed(
                move || {
                    if let Some(orch) = this.upgrade() {
                        tracing::info!(after = ?after, "auto-shutdown timer elapsed");
                        orch.stop(StopSource::Timeout);
                    }
                },
                after,
            )?;
        }

        if self.cfg.handle_signals {
            let this = self.this.clone();
            let handle = spawn_signal_watcher(self.token.clone(), move || {
                if let Some(orch) = this.upgrade() {
                    orch.stop(StopSource::Signal);
                }
            })
            .map_err(OrchestratorError::Signal)?;
            *self.signal_watcher.lock() = Some(handle);
        }
        Ok(())
    }

    /// Runs the main-thread unit's whole lifecycle on the calling thread.
    ///
    /// On a stop the unit is finished only after every worker schedule was joined.
    /// When the teardown itself was deferred to this thread, it finishes the unit.
    fn run_main(&self, slot: &Arc<UnitSlot>) {
        if !self.token.is_cancelled() && slot.starting().is_ok() {
            while !self.wake.wait_for(slot.interval()) {
                if !slot.is_running() {
                    break;
                }
                if panic::catch_unwind(AssertUnwindSafe(|| slot.tick())).is_err() {
                    slot.fault(FaultKind::SchedulerFault, slot.state(), "repeat() panicked on the main thread");
                    break;
                }
            }
        }
        if self.token.is_cancelled() {
            if self.deferred_teardown.load(Ordering::Acquire) {
                self.main_done.open();
                return;
            }
            self.workers_joined.wait();
        }
        slot.finish();
        self.main_done.open();
    }

    /// Starts the fleet and blocks until it is stopped.
    pub fn run(&self) -> Result<(), OrchestratorError> {
        self.start()?;
        self.wait();
        Ok(())
    }

    /// Blocks until the orchestrator reaches [`RunState::Stopped`].
    pub fn wait(&self) {
        self.stopped.wait();
    }

    /// Stops the fleet. Returns `true` for the call that won, `false` for every later one.
    ///
    /// The winning call cancels the [`shutdown_token`](Orchestrator::shutdown_token),
    /// stops and joins every worker schedule (last started first), then lets the
    /// main-thread unit finish on its own thread and runs `finishing()` on every
    /// remaining unit in reverse start order. Later calls are no-ops and return
    /// immediately; use [`Orchestrator::wait`] to block until teardown completed.
    ///
    /// Calling `stop()` on a fleet that was never started finishes every
    /// instantiated unit.
    pub fn stop(&self, source: StopSource) -> bool {
        let won = self.transition(RunState::Running, RunState::Stopping)
            || self.transition(RunState::Idle, RunState::Stopping);
        if !won {
            tracing::debug!(source = source.as_label(), state = %self.run_state(), "stop ignored");
            return false;
        }

        tracing::info!(source = source.as_label(), "shutdown requested");
        self.ctx
            .bus
            .publish(Event::new(EventKind::ShutdownRequested).with_source(source));
        self.token.cancel();
        self.wake.open();

        if *self.caller.lock() == Some(thread::current().id()) {
            tracing::debug!("stop requested from the start() thread; teardown deferred");
            self.deferred_teardown.store(true, Ordering::Release);
            return true;
        }

        if self.on_unit_thread() || self.on_subscriber_thread() {
            if let Some(this) = self.this.upgrade() {
                let spawned = thread::Builder::new()
                    .name("tickvisor-teardown".into())
                    .spawn(move || this.teardown());
                match spawned {
                    Ok(_) => return true,
                    Err(e) => tracing::error!(error = %e, "teardown thread not started; tearing down inline"),
                }
            }
        }

        self.teardown();
        true
    }

    fn teardown(&self) {
        self.watchdog.stop();
        self.auto_stop.stop();
        let slots = {
            let _launch = self.launch.lock();
            self.slots.read().clone()
        };

        for slot in slots.iter().rev().filter(|s| !s.runs_on_main_thread()) {
            slot.scheduler().stop();
        }
        self.workers_joined.open();
        if self.main_claimed.load(Ordering::Acquire) {
            self.main_done.wait();
        }
        // The main-thread unit started last, so it is finished first.
        for slot in slots.iter().rev().filter(|s| s.runs_on_main_thread()) {
            slot.finish();
        }
        for slot in slots.iter().rev().filter(|s| !s.runs_on_main_thread()) {
            slot.finish();
        }
        self.finalize();
    }

    fn finalize(&self) {
        self.run_state.store(RunState::Stopped as u8, Ordering::Release);
        tracing::info!(faults = self.ctx.faults().len(), "all units stopped");
        self.ctx.bus.publish(Event::new(EventKind::AllStopped));

        // The listener joins the subscriber workers on its way out.
        let listener = if self.on_subscriber_thread() {
            None
        } else {
            self.listener.lock().take()
        };
        let background = [self.signal_watcher.lock().take(), listener];
        for handle in background.into_iter().flatten() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!("background thread terminated by a panic");
            }
        }
        self.stopped.open();
    }

    /// Looks for worker units whose schedule thread died while they were `Running`.
    ///
    /// Each one is reported as [`FaultKind::SchedulerFault`], then finished.
    /// Runs periodically on the watchdog when `health_interval` is non-zero.
    /// Returns how many units were faulted by this call.
    pub fn check_health(&self) -> usize {
        if self.run_state() != RunState::Running {
            return 0;
        }
        let slots = self.slots.read().clone();
        let mut faulted = 0;
        for slot in slots.iter().filter(|s| !s.runs_on_main_thread() && s.is_running()) {
            let scheduler = slot.scheduler();
            if scheduler.state() == ScheduleState::Running && !scheduler.is_active() {
                slot.fault(
                    FaultKind::SchedulerFault,
                    LifecycleState::Running,
                    "schedule thread exited while the unit was running",
                );
                scheduler.stop();
                if slot.finish() {
                    faulted += 1;
                }
            }
        }
        faulted
    }

    /// Snapshot of every instantiated unit, in start order.
    pub fn status(&self) -> Vec<UnitStatus> {
        self.slots.read().iter().map(|s| s.status()).collect()
    }

    /// Lifecycle state of the named unit.
    pub fn unit_state(&self, name: &str) -> Option<LifecycleState> {
        self.slots
            .read()
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.state())
    }

    /// Unit-local faults recorded so far, oldest first.
    pub fn faults(&self) -> Vec<UnitFault> {
        self.ctx.faults()
    }

    /// Current fleet-level state.
    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire))
    }

    /// Event bus; subscribe before `start()` to observe the whole run.
    pub fn bus(&self) -> &Bus {
        &self.ctx.bus
    }

    /// Token cancelled as soon as a stop wins the race.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Configuration the orchestrator was built with.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.cfg
    }

    fn transition(&self, from: RunState, to: RunState) -> bool {
        self.run_state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn on_unit_thread(&self) -> bool {
        self.slots
            .read()
            .iter()
            .any(|s| s.scheduler().on_own_thread())
    }

    fn on_subscriber_thread(&self) -> bool {
        self.subscriber_threads.contains(&thread::current().id())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.run_state() != RunState::Stopped {
            self.stop(StopSource::Manual);
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("run_state", &self.run_state())
            .field("units", &self.slots.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RuntimeError, StartupError};
    use crate::subscribers::Subscribe;
    use crate::units::{FrameBudget, Progress, ResourceUnit, TaskUnit, UnitFn};
    use std::sync::Barrier;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn quiet_config() -> OrchestratorConfig {
        OrchestratorConfig {
            handle_signals: false,
            ..OrchestratorConfig::default()
        }
    }

    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<(String, ThreadId)>>>);

    impl Journal {
        fn note(&self, what: String) {
            self.0.lock().push((what, thread::current().id()));
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().iter().map(|(w, _)| w.clone()).collect()
        }

        fn matching(&self, prefix: &str) -> Vec<String> {
            self.entries()
                .into_iter()
                .filter(|e| e.starts_with(prefix))
                .collect()
        }

        fn thread_of(&self, what: &str) -> Option<ThreadId> {
            self.0.lock().iter().find(|(w, _)| w == what).map(|(_, t)| *t)
        }
    }

    struct Probe {
        name: &'static str,
        fail_start: bool,
        repeats: u64,
        journal: Journal,
    }

    impl TaskUnit for Probe {
        fn starting(&mut self) -> Result<(), StartupError> {
            self.journal.note(format!("start:{}", self.name));
            if self.fail_start {
                return Err(StartupError::new("no surface"));
            }
            Ok(())
        }

        fn repeat(&mut self) -> Result<Progress, RuntimeError> {
            if self.repeats == 0 {
                self.journal.note(format!("repeat:{}", self.name));
            }
            self.repeats += 1;
            Ok(Progress::Continue)
        }

        fn finishing(&mut self) {
            self.journal.note(format!("finish:{}", self.name));
        }
    }

    fn probe(name: &'static str, interval_ms: u64, fail_start: bool, journal: &Journal) -> UnitSpec {
        let journal = journal.clone();
        UnitSpec::new(name, Duration::from_millis(interval_ms), move || {
            Ok(Box::new(Probe {
                name,
                fail_start,
                repeats: 0,
                journal,
            }))
        })
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn test_worker_unit_cadence_over_one_second() {
        let journal = Journal::default();
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(probe("ticker", 100, false, &journal))
            .build();
        orch.instantiate().unwrap();
        orch.start().unwrap();

        thread::sleep(Duration::from_millis(1050));
        assert!(orch.stop(StopSource::Manual));

        let status = &orch.status()[0];
        assert!(
            (9..=11).contains(&status.intervals),
            "recorded {} intervals",
            status.intervals
        );
        assert_eq!(status.state, LifecycleState::Destroyed);
        assert_eq!(orch.run_state(), RunState::Stopped);
        assert_eq!(journal.matching("finish:"), vec!["finish:ticker"]);
    }

    #[test]
    fn test_failed_starting_only_affects_that_unit() {
        let journal = Journal::default();
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(probe("a", 20, false, &journal))
            .with_unit(probe("b", 20, true, &journal))
            .with_unit(probe("c", 20, false, &journal))
            .build();
        orch.instantiate().unwrap();
        orch.start().unwrap();

        assert_eq!(orch.unit_state("a"), Some(LifecycleState::Running));
        assert_eq!(orch.unit_state("b"), Some(LifecycleState::Destroyed));
        assert_eq!(orch.unit_state("c"), Some(LifecycleState::Running));
        assert_eq!(journal.matching("finish:"), vec!["finish:b"]);

        let faults = orch.faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].unit, "b");
        assert_eq!(faults[0].kind, FaultKind::Startup);
        assert_eq!(faults[0].state, LifecycleState::Starting);

        assert!(orch.stop(StopSource::Manual));
        let finished = journal.matching("finish:");
        assert_eq!(finished, vec!["finish:b", "finish:c", "finish:a"]);
    }

    #[test]
    fn test_concurrent_stops_tear_down_once() {
        let journal = Journal::default();
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(probe("a", 10, false, &journal))
            .with_unit(probe("b", 10, false, &journal))
            .build();
        let mut rx = orch.bus().subscribe();
        orch.instantiate().unwrap();
        orch.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        let barrier = Arc::new(Barrier::new(2));
        let racers: Vec<_> = [StopSource::Signal, StopSource::Timeout]
            .into_iter()
            .map(|source| {
                let orch = Arc::clone(&orch);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    orch.stop(source)
                })
            })
            .collect();
        let wins: Vec<bool> = racers.into_iter().map(|h| h.join().unwrap()).collect();
        orch.wait();

        assert_eq!(wins.iter().filter(|w| **w).count(), 1);
        assert_eq!(journal.matching("finish:"), vec!["finish:b", "finish:a"]);
        assert!(!orch.stop(StopSource::Manual));

        let events = drain(&mut rx);
        let count = |kind| events.iter().filter(|e| e.kind == kind).count();
        assert_eq!(count(EventKind::ShutdownRequested), 1);
        assert_eq!(count(EventKind::AllStopped), 1);
        assert_eq!(count(EventKind::UnitDestroyed), 2);
    }

    #[test]
    fn test_two_main_thread_units_are_rejected_at_start() {
        let journal = Journal::default();
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(probe("left", 10, false, &journal).on_main_thread())
            .with_unit(probe("right", 10, false, &journal).on_main_thread())
            .build();
        orch.instantiate().unwrap();

        match orch.start() {
            Err(OrchestratorError::MultipleMainThreadUnits { first, second }) => {
                assert_eq!(first, "left");
                assert_eq!(second, "right");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(orch.run_state(), RunState::Idle);
        assert!(journal.matching("start:").is_empty());

        assert!(orch.stop(StopSource::Manual));
        assert_eq!(journal.matching("finish:"), vec!["finish:right", "finish:left"]);
    }

    #[test]
    fn test_setup_error_aborts_the_whole_fleet() {
        let journal = Journal::default();
        let third_built = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&third_built);
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(probe("first", 10, false, &journal))
            .with_unit(UnitSpec::new("broken", Duration::from_millis(10), || {
                Err(SetupError::new("capability handle unavailable"))
            }))
            .with_unit(UnitSpec::new("third", Duration::from_millis(10), move || {
                flag.store(true, Ordering::SeqCst);
                Ok(UnitFn::boxed(|| Ok(Progress::Continue)))
            }))
            .build();

        match orch.instantiate() {
            Err(OrchestratorError::Setup { unit, state, source }) => {
                assert_eq!(unit, "broken");
                assert_eq!(state, LifecycleState::Constructed);
                assert_eq!(source.reason, "capability handle unavailable");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!third_built.load(Ordering::SeqCst));
        assert_eq!(journal.matching("finish:"), vec!["finish:first"]);
        assert!(orch.status().is_empty());
        assert_eq!(orch.run_state(), RunState::Stopped);
        assert!(matches!(orch.start(), Err(OrchestratorError::AlreadyStarted)));
    }

    #[test]
    fn test_main_thread_unit_owns_the_calling_thread_and_finishes_first() {
        let journal = Journal::default();
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(probe("w1", 10, false, &journal))
            .with_unit(probe("display", 10, false, &journal).on_main_thread())
            .with_unit(probe("w2", 10, false, &journal))
            .build();
        orch.instantiate().unwrap();

        let runner = {
            let orch = Arc::clone(&orch);
            thread::spawn(move || orch.start())
        };
        let main_id = runner.thread().id();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(orch.run_state(), RunState::Running);
        assert!(!runner.is_finished(), "start() must block while the main unit runs");
        assert!(orch.stop(StopSource::Manual));
        runner.join().unwrap().unwrap();

        for what in ["start:display", "repeat:display", "finish:display"] {
            assert_eq!(journal.thread_of(what), Some(main_id), "{what}");
        }
        assert_ne!(journal.thread_of("repeat:w1"), Some(main_id));

        let starts = journal.matching("start:");
        assert_eq!(starts, vec!["start:w1", "start:w2", "start:display"]);
        let finished = journal.matching("finish:");
        assert_eq!(finished, vec!["finish:display", "finish:w2", "finish:w1"]);
    }

    #[test]
    fn test_done_is_advisory() {
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(UnitSpec::new("window", Duration::from_millis(10), || {
                Ok(Box::new(ResourceUnit::new(FrameBudget::new(2))))
            }))
            .build();
        let mut rx = orch.bus().subscribe();
        orch.instantiate().unwrap();
        orch.start().unwrap();
        thread::sleep(Duration::from_millis(150));

        let status = &orch.status()[0];
        assert_eq!(status.state, LifecycleState::Running);
        assert!(status.repeats > 3, "repeats = {}", status.repeats);
        orch.stop(StopSource::Manual);

        let done = drain(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::UnitReportedDone)
            .count();
        assert_eq!(done, 1);
    }

    #[test]
    fn test_unrecoverable_error_stops_only_that_unit() {
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(UnitSpec::new("good", Duration::from_millis(10), || {
                Ok(UnitFn::boxed(|| Ok(Progress::Continue)))
            }))
            .with_unit(UnitSpec::new("bad", Duration::from_millis(10), || {
                let mut n = 0;
                Ok(UnitFn::boxed(move || {
                    n += 1;
                    if n == 3 {
                        Err(RuntimeError::unrecoverable("surface lost"))
                    } else {
                        Ok(Progress::Continue)
                    }
                }))
            }))
            .build();
        orch.instantiate().unwrap();
        orch.start().unwrap();
        thread::sleep(Duration::from_millis(200));

        assert_eq!(orch.unit_state("bad"), Some(LifecycleState::Destroyed));
        assert_eq!(orch.unit_state("good"), Some(LifecycleState::Running));
        assert_eq!(orch.run_state(), RunState::Running);
        let faults = orch.faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::Runtime);
        assert_eq!(faults[0].unit, "bad");

        assert!(orch.stop(StopSource::Manual));
        assert_eq!(orch.unit_state("good"), Some(LifecycleState::Destroyed));
    }

    #[test]
    fn test_watchdog_reports_dead_schedule_thread() {
        let cfg = OrchestratorConfig {
            health_interval: Duration::from_millis(20),
            ..quiet_config()
        };
        let orch = Orchestrator::builder(cfg)
            .with_unit(UnitSpec::new("crashy", Duration::from_millis(10), || {
                Ok(UnitFn::boxed(|| panic!("render thread blew up")))
            }))
            .build();
        orch.instantiate().unwrap();
        orch.start().unwrap();
        thread::sleep(Duration::from_millis(200));

        assert_eq!(orch.unit_state("crashy"), Some(LifecycleState::Destroyed));
        let faults = orch.faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::SchedulerFault);
        assert_eq!(faults[0].state, LifecycleState::Running);
        assert!(orch.stop(StopSource::Manual));
    }

    #[test]
    fn test_auto_shutdown_timer_stops_the_fleet() {
        let journal = Journal::default();
        let cfg = OrchestratorConfig {
            auto_shutdown: Duration::from_millis(150),
            ..quiet_config()
        };
        let orch = Orchestrator::builder(cfg)
            .with_unit(probe("worker", 10, false, &journal))
            .with_unit(probe("display", 10, false, &journal).on_main_thread())
            .build();
        let mut rx = orch.bus().subscribe();
        orch.instantiate().unwrap();

        orch.start().unwrap();

        assert_eq!(orch.run_state(), RunState::Stopped);
        assert!(orch.shutdown_token().is_cancelled());
        assert_eq!(journal.matching("finish:"), vec!["finish:display", "finish:worker"]);
        let requested: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::ShutdownRequested)
            .collect();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].source, Some(StopSource::Timeout));
    }

    #[test]
    fn test_stop_from_inside_main_unit_is_deferred_to_start() {
        let slot: Arc<Mutex<Weak<Orchestrator>>> = Arc::new(Mutex::new(Weak::new()));
        let handle = Arc::clone(&slot);
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(
                UnitSpec::new("display", Duration::from_millis(10), move || {
                    let mut frames = 0;
                    Ok(UnitFn::boxed(move || {
                        frames += 1;
                        if frames == 3 {
                            if let Some(orch) = handle.lock().upgrade() {
                                assert!(orch.stop(StopSource::Manual));
                            }
                        }
                        Ok(Progress::Continue)
                    }))
                })
                .on_main_thread(),
            )
            .build();
        *slot.lock() = Arc::downgrade(&orch);
        orch.instantiate().unwrap();

        orch.start().unwrap();

        assert_eq!(orch.run_state(), RunState::Stopped);
        let status = &orch.status()[0];
        assert_eq!(status.state, LifecycleState::Destroyed);
        assert_eq!(status.repeats, 3);
    }

    #[test]
    fn test_stop_from_worker_unit_does_not_deadlock() {
        let slot: Arc<Mutex<Weak<Orchestrator>>> = Arc::new(Mutex::new(Weak::new()));
        let handle = Arc::clone(&slot);
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(UnitSpec::new("quitter", Duration::from_millis(10), move || {
                Ok(UnitFn::boxed(move || {
                    if let Some(orch) = handle.lock().upgrade() {
                        orch.stop(StopSource::Manual);
                    }
                    Ok(Progress::Continue)
                }))
            }))
            .build();
        *slot.lock() = Arc::downgrade(&orch);
        orch.instantiate().unwrap();

        orch.run().unwrap();

        assert_eq!(orch.run_state(), RunState::Stopped);
        assert_eq!(orch.unit_state("quitter"), Some(LifecycleState::Destroyed));
    }

    #[test]
    fn test_start_preconditions() {
        let orch = Orchestrator::builder(quiet_config()).build();
        assert!(matches!(orch.start(), Err(OrchestratorError::NotInstantiated)));
        orch.instantiate().unwrap();
        assert!(matches!(orch.instantiate(), Err(OrchestratorError::AlreadyInstantiated)));
        orch.start().unwrap();
        assert!(matches!(orch.start(), Err(OrchestratorError::AlreadyStarted)));
        assert!(orch.stop(StopSource::Manual));
        assert!(matches!(orch.start(), Err(OrchestratorError::AlreadyStarted)));
    }

    #[test]
    fn test_main_unit_finishes_after_workers_are_joined() {
        let journal = Journal::default();
        let slow = {
            let journal = journal.clone();
            UnitSpec::new("slow", Duration::from_millis(5), move || {
                Ok(UnitFn::boxed(move || {
                    journal.note("repeat-begin:slow".into());
                    thread::sleep(Duration::from_millis(300));
                    journal.note("repeat-end:slow".into());
                    Ok(Progress::Continue)
                }))
            })
        };
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(slow)
            .with_unit(probe("display", 10, false, &journal).on_main_thread())
            .build();
        orch.instantiate().unwrap();

        let runner = {
            let orch = Arc::clone(&orch);
            thread::spawn(move || orch.start())
        };
        thread::sleep(Duration::from_millis(100));
        assert!(orch.stop(StopSource::Manual));
        runner.join().unwrap().unwrap();

        let entries = journal.entries();
        let position = |what: &str| entries.iter().position(|e| e == what);
        let repeat_end = position("repeat-end:slow").expect("worker repeat completed");
        let finished = position("finish:display").expect("display finished");
        assert!(repeat_end < finished, "{entries:?}");
        assert_eq!(orch.unit_state("slow"), Some(LifecycleState::Destroyed));
    }

    #[test]
    fn test_instantiate_after_stop_builds_nothing() {
        let built = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&built);
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(UnitSpec::new("late", Duration::from_millis(10), move || {
                flag.store(true, Ordering::SeqCst);
                Ok(UnitFn::boxed(|| Ok(Progress::Continue)))
            }))
            .build();

        assert!(orch.stop(StopSource::Manual));
        assert!(matches!(orch.instantiate(), Err(OrchestratorError::AlreadyStarted)));
        assert!(!built.load(Ordering::SeqCst));
        assert!(orch.status().is_empty());
        assert_eq!(orch.run_state(), RunState::Stopped);
    }

    struct StopsWhilePreparing {
        orch: Arc<Mutex<Weak<Orchestrator>>>,
        journal: Journal,
    }

    impl TaskUnit for StopsWhilePreparing {
        fn prepare(&mut self) -> Result<(), SetupError> {
            if let Some(orch) = self.orch.lock().upgrade() {
                assert!(orch.stop(StopSource::Manual));
            }
            Ok(())
        }

        fn repeat(&mut self) -> Result<Progress, RuntimeError> {
            Ok(Progress::Continue)
        }

        fn finishing(&mut self) {
            self.journal.note("finish:eager".into());
        }
    }

    #[test]
    fn test_stop_during_instantiate_finishes_prepared_units() {
        let journal = Journal::default();
        let handle: Arc<Mutex<Weak<Orchestrator>>> = Arc::new(Mutex::new(Weak::new()));
        let unit = StopsWhilePreparing {
            orch: Arc::clone(&handle),
            journal: journal.clone(),
        };
        let orch = Orchestrator::builder(quiet_config())
            .with_unit(UnitSpec::new("eager", Duration::from_millis(10), move || {
                Ok(Box::new(unit))
            }))
            .build();
        *handle.lock() = Arc::downgrade(&orch);

        orch.instantiate().unwrap();

        assert_eq!(orch.run_state(), RunState::Stopped);
        assert_eq!(orch.unit_state("eager"), Some(LifecycleState::Destroyed));
        assert_eq!(journal.matching("finish:"), vec!["finish:eager"]);
    }

    struct StopOnRunning(Mutex<Weak<Orchestrator>>);

    impl Subscribe for StopOnRunning {
        fn on_event(&self, ev: &Event) {
            if ev.kind == EventKind::UnitRunning {
                if let Some(orch) = self.0.lock().upgrade() {
                    orch.stop(StopSource::Manual);
                }
            }
        }

        fn name(&self) -> &'static str {
            "stop-on-running"
        }
    }

    #[test]
    fn test_stop_from_subscriber_completes_teardown() {
        let stopper = Arc::new(StopOnRunning(Mutex::new(Weak::new())));
        let orch = Orchestrator::builder(quiet_config())
            .with_subscribers(vec![Arc::clone(&stopper) as Arc<dyn Subscribe>])
            .with_unit(UnitSpec::new("ticker", Duration::from_millis(10), || {
                Ok(UnitFn::boxed(|| Ok(Progress::Continue)))
            }))
            .build();
        *stopper.0.lock() = Arc::downgrade(&orch);
        orch.instantiate().unwrap();
        orch.start().unwrap();

        assert!(
            orch.stopped.wait_for(Duration::from_secs(2)),
            "teardown did not complete"
        );
        assert_eq!(orch.run_state(), RunState::Stopped);
        assert_eq!(orch.unit_state("ticker"), Some(LifecycleState::Destroyed));
    }

    #[cfg(unix)]
    #[test]
    fn test_repeated_interrupts_stop_the_fleet_once() {
        use crate::core::shutdown::interrupt_self;

        let journal = Journal::default();
        let cfg = OrchestratorConfig {
            handle_signals: true,
            ..quiet_config()
        };
        let orch = Orchestrator::builder(cfg)
            .with_unit(probe("worker", 10, false, &journal))
            .build();
        let mut rx = orch.bus().subscribe();
        orch.instantiate().unwrap();
        orch.start().unwrap();

        interrupt_self();
        interrupt_self();
        assert!(
            orch.stopped.wait_for(Duration::from_secs(2)),
            "interrupt did not stop the fleet"
        );
        thread::sleep(Duration::from_millis(50));

        let requested: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::ShutdownRequested)
            .collect();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].source, Some(StopSource::Signal));
        assert_eq!(journal.matching("finish:"), vec!["finish:worker"]);
    }
}
