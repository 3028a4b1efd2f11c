//! Runtime core: orchestration and lifecycle.
//!
//! This module contains the orchestration machinery of the tickvisor runtime.
//! The public API from this module is [`Orchestrator`] (with its
//! [`OrchestratorBuilder`] and [`OrchestratorConfig`]), which starts, repeats
//! and tears down a fleet of task units.
//!
//! Internal modules:
//! - [`orchestrator`]: instantiate/start/stop protocol, health watchdog, auto-shutdown;
//! - [`slot`]: one unit under orchestration (lifecycle transitions, tick, finish);
//! - [`builder`]: wiring of bus, subscribers and unit specs;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`latch`]: one-shot blocking latch used by the start/stop handshake.

mod builder;
mod config;
mod latch;
mod orchestrator;
mod shutdown;
mod slot;

pub use builder::OrchestratorBuilder;
pub use config::OrchestratorConfig;
pub use orchestrator::{Orchestrator, RunState};
pub use slot::UnitStatus;
