//! Error types used by the tickvisor runtime and its task units.
//!
//! Hook-level errors are returned by a unit's lifecycle hooks:
//!
//! - [`SetupError`]: `prepare()` (or the unit factory) failed; aborts instantiation.
//! - [`StartupError`]: `starting()` could not acquire the backing resource.
//! - [`RuntimeError`]: a single `repeat()` invocation failed.
//!
//! Runtime-level errors are raised by the orchestration machinery itself:
//!
//! - [`SchedulerError`]: an [`EventScheduler`](crate::EventScheduler) could not be armed.
//! - [`OrchestratorError`]: the fleet could not be instantiated or started.
//!
//! Unit-local failures never abort the fleet; they are recorded as [`UnitFault`]s
//! carrying the unit name and the lifecycle state at the time of failure.

use std::fmt;

use thiserror::Error;

use crate::units::LifecycleState;

/// A unit could not be constructed or prepared.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("setup failed: {reason}")]
pub struct SetupError {
    /// Human-readable cause.
    pub reason: String,
}

impl SetupError {
    /// Creates a setup error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The unit's backing resource could not be acquired in `starting()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("startup failed: {reason}")]
pub struct StartupError {
    /// Human-readable cause.
    pub reason: String,
}

impl StartupError {
    /// Creates a startup error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// # Errors produced by a single `repeat()` invocation.
///
/// [`RuntimeError::Recoverable`] is logged and the schedule keeps firing.
/// [`RuntimeError::Unrecoverable`] stops that unit only; the rest of the fleet continues.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The invocation failed but the next tick may succeed.
    #[error("repeat failed: {reason}")]
    Recoverable {
        /// Human-readable cause.
        reason: String,
    },

    /// The unit cannot make further progress.
    #[error("unrecoverable failure: {reason}")]
    Unrecoverable {
        /// Human-readable cause.
        reason: String,
    },
}

impl RuntimeError {
    /// Shorthand for [`RuntimeError::Recoverable`].
    pub fn recoverable(reason: impl Into<String>) -> Self {
        Self::Recoverable {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`RuntimeError::Unrecoverable`].
    pub fn unrecoverable(reason: impl Into<String>) -> Self {
        Self::Unrecoverable {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::recoverable("busy").as_label(), "repeat_failed");
    /// assert_eq!(RuntimeError::unrecoverable("gone").as_label(), "repeat_unrecoverable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Recoverable { .. } => "repeat_failed",
            RuntimeError::Unrecoverable { .. } => "repeat_unrecoverable",
        }
    }

    /// Whether the schedule should keep firing after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RuntimeError::Recoverable { .. })
    }
}

/// # Errors produced while arming an [`EventScheduler`](crate::EventScheduler).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The scheduler already owns a live thread; `stop()` must be called first.
    #[error("scheduler '{label}' already owns a running schedule")]
    AlreadyActive {
        /// Label of the scheduler.
        label: String,
    },

    /// The operating system refused to spawn the scheduling thread.
    #[error("failed to spawn thread for scheduler '{label}': {source}")]
    Spawn {
        /// Label of the scheduler.
        label: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::AlreadyActive { .. } => "scheduler_already_active",
            SchedulerError::Spawn { .. } => "scheduler_spawn_failed",
        }
    }
}

/// # Errors produced by the orchestrator.
///
/// Only [`OrchestratorError::Setup`] is fatal to the process: it means the fleet
/// could not be assembled at all. Everything that happens after `start()` is
/// unit-local and reported as a [`UnitFault`] instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// A unit failed to construct or prepare; no unit of the fleet was kept.
    #[error("unit '{unit}' failed setup in state {state}: {source}")]
    Setup {
        /// Name of the offending unit.
        unit: String,
        /// Lifecycle state at the time of failure.
        state: LifecycleState,
        /// Underlying setup error.
        #[source]
        source: SetupError,
    },

    /// More than one unit asked to own the calling thread.
    #[error("units '{first}' and '{second}' both require the main thread")]
    MultipleMainThreadUnits {
        /// First registered main-thread unit.
        first: String,
        /// Second registered main-thread unit.
        second: String,
    },

    /// `start()` was called before `instantiate()`.
    #[error("orchestrator has no instantiated units")]
    NotInstantiated,

    /// `instantiate()` was called twice.
    #[error("orchestrator units were already instantiated")]
    AlreadyInstantiated,

    /// `start()` was called twice, or after `stop()`.
    #[error("orchestrator was already started or stopped")]
    AlreadyStarted,

    /// A timer or watchdog schedule could not be armed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The signal watcher could not be installed.
    #[error("failed to install signal watcher: {0}")]
    Signal(#[source] std::io::Error),
}

impl OrchestratorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OrchestratorError::Setup { .. } => "orchestrator_setup_failed",
            OrchestratorError::MultipleMainThreadUnits { .. } => "orchestrator_main_thread_conflict",
            OrchestratorError::NotInstantiated => "orchestrator_not_instantiated",
            OrchestratorError::AlreadyInstantiated => "orchestrator_already_instantiated",
            OrchestratorError::AlreadyStarted => "orchestrator_already_started",
            OrchestratorError::Scheduler(e) => e.as_label(),
            OrchestratorError::Signal(_) => "orchestrator_signal_failed",
        }
    }
}

/// Classification of a unit-local failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// `prepare()` failed.
    Setup,
    /// `starting()` failed; the unit was torn down without entering its loop.
    Startup,
    /// A `repeat()` invocation failed.
    Runtime,
    /// The scheduling thread exited while the unit was still `Running`.
    SchedulerFault,
}

impl FaultKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FaultKind::Setup => "setup_error",
            FaultKind::Startup => "startup_error",
            FaultKind::Runtime => "runtime_error",
            FaultKind::SchedulerFault => "scheduler_fault",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A unit-local failure, as recorded by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFault {
    /// Name of the offending unit.
    pub unit: String,
    /// Lifecycle state at the time of failure.
    pub state: LifecycleState,
    /// What went wrong.
    pub kind: FaultKind,
    /// Human-readable cause.
    pub reason: String,
}

impl fmt::Display for UnitFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unit '{}' {} in state {}: {}",
            self.unit, self.kind, self.state, self.reason
        )
    }
}
