//! Thread-backed repeating and one-shot schedules.
//!
//! This module groups the [`EventScheduler`] and the data it exposes:
//!
//! ## Contents
//! - [`EventScheduler`] owns at most one scheduling thread; blocking, idempotent `stop()`
//! - [`Cadence`] fixed-interval repetition or a one-shot delay
//! - [`ScheduleState`] `Idle → Running → StopRequested → Stopped`
//!
//! ## Quick wiring
//! ```text
//! Orchestrator::start()
//!   └─► UnitSlot (worker affinity)
//!         └─► EventScheduler::schedule_repeating(tick, interval)
//!               └─► thread: loop { sleep(interval) ─► tick() }
//!
//! Orchestrator::stop()
//!   └─► EventScheduler::stop()  (wakes the sleeper, joins the thread)
//! ```

mod cadence;
mod scheduler;
mod signal;

pub use cadence::{Cadence, ScheduleState};
pub use scheduler::EventScheduler;
