//! # Task-unit abstraction.
//!
//! A [`TaskUnit`] is a recurring unit of work with four hooks. The runtime owns
//! the unit exclusively and calls the hooks in lifecycle order:
//!
//! ```text
//! prepare() ─► starting() ─► repeat() … repeat() ─► finishing()
//! ```
//!
//! Cadence, thread affinity and the unit's name live on its
//! [`UnitSpec`](crate::UnitSpec); interval measurement and state tracking are
//! done by the runtime, so implementations only describe the work.

use crate::error::{RuntimeError, SetupError, StartupError};

/// Result of one `repeat()` invocation.
///
/// `Done` is **advisory**: the runtime logs it but keeps the schedule running.
/// Only the orchestrator decides when a unit's schedule stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More work is expected.
    Continue,
    /// The unit has nothing more to do.
    Done,
}

/// A recurring, lifecycle-managed unit of work.
///
/// # Example
/// ```
/// use tickvisor::{Progress, RuntimeError, TaskUnit};
///
/// struct Heartbeat { beats: u64 }
///
/// impl TaskUnit for Heartbeat {
///     fn repeat(&mut self) -> Result<Progress, RuntimeError> {
///         self.beats += 1;
///         Ok(Progress::Continue)
///     }
/// }
/// ```
pub trait TaskUnit: Send + 'static {
    /// One-time, cheap setup. Must be idempotent.
    fn prepare(&mut self) -> Result<(), SetupError> {
        Ok(())
    }

    /// Acquires the unit's backing resource.
    ///
    /// On error the unit is torn down without entering its repeat loop.
    fn starting(&mut self) -> Result<(), StartupError> {
        Ok(())
    }

    /// The periodic action. Invocations of one unit never overlap.
    fn repeat(&mut self) -> Result<Progress, RuntimeError>;

    /// Releases the backing resource.
    ///
    /// Called exactly once, also when `starting()` failed or was never reached,
    /// so implementations must tolerate a partially acquired resource.
    fn finishing(&mut self) {}
}
