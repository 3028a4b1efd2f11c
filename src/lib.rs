//! # tickvisor
//!
//! **Tickvisor** is a runtime for recurring, lifecycle-managed units of work.
//!
//! Each task unit repeats at a fixed interval, either on its own worker thread
//! or on the thread that started the runtime, under a central orchestrator that
//! starts, repeats and tears units down in a defined order. Shutdown can come
//! from an OS signal, an auto-shutdown timer, or the owner, and every path
//! converges on the same idempotent `stop()`.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   UnitSpec   │   │   UnitSpec   │   │   UnitSpec   │
//!     │  (worker #1) │   │  (worker #2) │   │ (main thread)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - UnitSlot per unit (lifecycle state, IntervalClock, faults)     │
//! │  - health watchdog + auto-shutdown timer (EventScheduler)         │
//! │  - signal watcher thread (SIGINT / SIGTERM / SIGQUIT)             │
//! │  - CancellationToken (cancelled when stop wins)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │EventScheduler│   │EventScheduler│   │ calling      │   │
//!     │ (own thread) │   │ (own thread) │   │ thread loop  │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ tick(): repeat() │                  │                 │
//!      │ Publishes:       │                  │                 │
//!      │ - UnitRunning    │ - RepeatFailed   │ - UnitDestroyed │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: OrchestratorConfig::bus_capacity)         │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │    listener thread     │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                            SubscriberSet
//!                           (per-sub queues)
//!                          ┌─────────┼─────────┐
//!                          ▼         ▼         ▼
//!                       thread1   thread2   threadN
//! ```
//!
//! ### Lifecycle
//! ```text
//! instantiate(): factory() ─► Constructed ─prepare()─► Prepared      (SetupError aborts the fleet)
//!
//! start():  Prepared ─starting()─► Starting ─ok─► Running
//!                                      │
//!                                      └─ StartupError ─► finishing() ─► Destroyed (others unaffected)
//!
//! Running: every interval {
//!   ├─► mark interval on the unit's IntervalClock
//!   ├─► repeat()
//!   │     ├─ Continue            ─► keep going
//!   │     ├─ Done                ─► logged once, keep going (advisory)
//!   │     ├─ Err(Recoverable)    ─► warn + RepeatFailed, keep going
//!   │     └─ Err(Unrecoverable)  ─► fault, stop this unit only
//!   └─► watchdog: schedule thread gone while Running ─► SchedulerFault, stop this unit
//! }
//!
//! stop(): join worker schedules (last started first) ─► finishing() in reverse start order
//! ```
//!
//! ## Features
//! | Area              | Description                                                         | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------------|---------------------------------------------|
//! | **Units**         | Define recurring work and its backing resource.                     | [`TaskUnit`], [`UnitFn`], [`ResourceUnit`]  |
//! | **Orchestration** | Start, repeat and tear down a fleet; signal and timer shutdown.     | [`Orchestrator`], [`UnitSpec`]              |
//! | **Scheduling**    | Thread-per-schedule repeating and one-shot timers.                  | [`EventScheduler`], [`Cadence`]             |
//! | **Timing**        | Interval measurement and duration formatting.                       | [`IntervalClock`], [`format_duration`]      |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom subscribers).  | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for setup, startup, runtime and orchestration.         | [`OrchestratorError`], [`RuntimeError`]     |
//! | **Configuration** | Centralize runtime settings.                                        | [`OrchestratorConfig`]                      |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber, rendering events via `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tickvisor::{
//!     mailbox, Headless, Orchestrator, OrchestratorConfig, Progress, ResourceUnit, UnitFn, UnitSpec,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = OrchestratorConfig {
//!         auto_shutdown: Duration::from_millis(200),
//!         handle_signals: false,
//!         ..OrchestratorConfig::default()
//!     };
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn tickvisor::Subscribe>> = vec![Arc::new(tickvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn tickvisor::Subscribe>> = Vec::new();
//!
//!     let (outbox, inbox) = mailbox::<String>();
//!
//!     let producer = UnitSpec::new("producer", Duration::from_millis(20), move || {
//!         let mut n = 0u32;
//!         Ok(UnitFn::boxed(move || {
//!             n += 1;
//!             outbox.send(format!("message #{n}"));
//!             Ok(Progress::Continue)
//!         }))
//!     });
//!
//!     // Runs on the thread that calls start(); start() blocks until the fleet stops.
//!     let display = UnitSpec::new("display", Duration::from_millis(10), move || {
//!         Ok(Box::new(ResourceUnit::with_inbox(
//!             Box::new(Headless::default()),
//!             inbox,
//!             |msg: String| { let _ = msg; },
//!         )))
//!     })
//!     .on_main_thread();
//!
//!     let orch = Orchestrator::builder(cfg)
//!         .with_subscribers(subs)
//!         .with_unit(producer)
//!         .with_unit(display)
//!         .build();
//!
//!     orch.instantiate()?;
//!     orch.start()?;
//!     assert!(orch.faults().is_empty());
//!     Ok(())
//! }
//! ```

mod clock;
mod core;
mod error;
mod events;
mod schedule;
mod subscribers;
mod units;

// ---- Public re-exports ----

pub use clock::{IntervalClock, ScopedTimer, format_duration};
pub use core::{Orchestrator, OrchestratorBuilder, OrchestratorConfig, RunState, UnitStatus};
pub use error::{
    FaultKind, OrchestratorError, RuntimeError, SchedulerError, SetupError, StartupError, UnitFault,
};
pub use events::{Bus, Event, EventKind, StopSource};
pub use schedule::{Cadence, EventScheduler, ScheduleState};
pub use subscribers::{Subscribe, SubscriberSet};
pub use units::{
    Backing, BackingKind, FrameBudget, Headless, Inbox, LifecycleState, Outbox, Progress,
    ResourceUnit, TaskUnit, UnitFactory, UnitFn, UnitSpec, mailbox,
};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
