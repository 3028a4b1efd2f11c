//! # Global runtime configuration.
//!
//! Provides [`OrchestratorConfig`], the centralized settings for the orchestrator.
//!
//! Config is used in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::builder(config)`
//! 2. **UnitSpec defaults**: `UnitSpec::with_defaults(name, &config, factory)`
//!
//! ## Sentinel values
//! - `auto_shutdown = 0s` → no auto-shutdown timer
//! - `health_interval = 0s` → no health watchdog

use std::time::Duration;

/// Global configuration for the orchestrator.
///
/// Defines:
/// - **Shutdown behavior**: optional auto-shutdown timer, OS signal handling
/// - **Fault detection**: health watchdog cadence
/// - **Event system**: bus capacity for event delivery
/// - **Unit defaults**: repeat interval
///
/// ## Field semantics
/// - `auto_shutdown`: Stop the fleet after this long (`0s` = run until stopped)
/// - `health_interval`: How often dead schedule threads are looked for (`0s` = never)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `default_interval`: Repeat interval for `UnitSpec::with_defaults`
/// - `handle_signals`: Install the SIGINT/SIGTERM/SIGQUIT watcher on `start()`
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Time after `start()` at which the fleet is stopped with `StopSource::Timeout`.
    ///
    /// Races with the signal path; whichever arrives first wins, the other is a no-op.
    pub auto_shutdown: Duration,

    /// Cadence of the health watchdog.
    ///
    /// A worker unit that is still `Running` while its schedule thread is gone
    /// is reported as a `SchedulerFault` and torn down.
    pub health_interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Default unit repeat interval.
    ///
    /// Used by `UnitSpec::with_defaults()`. Can be overridden per unit.
    pub default_interval: Duration,

    /// Whether `start()` installs the OS signal watcher.
    ///
    /// Disable when the host application owns signal handling and calls `stop()` itself.
    pub handle_signals: bool,
}

impl OrchestratorConfig {
    /// Returns the auto-shutdown delay as an `Option`.
    ///
    /// - `None` → run until stopped explicitly or by a signal
    /// - `Some(d)` → stop `d` after `start()`
    #[inline]
    pub fn auto_shutdown_after(&self) -> Option<Duration> {
        if self.auto_shutdown == Duration::ZERO {
            None
        } else {
            Some(self.auto_shutdown)
        }
    }

    /// Returns the watchdog cadence as an `Option`.
    ///
    /// - `None` → no watchdog
    /// - `Some(d)` → check worker schedules every `d`
    #[inline]
    pub fn health_check_interval(&self) -> Option<Duration> {
        if self.health_interval == Duration::ZERO {
            None
        } else {
            Some(self.health_interval)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    ///
    /// The `Bus` should use this value to avoid constructing an invalid channel.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for OrchestratorConfig {
    /// Default configuration:
    ///
    /// - `auto_shutdown = 0s` (run until stopped)
    /// - `health_interval = 250ms`
    /// - `bus_capacity = 1024` (good baseline)
    /// - `default_interval = 100ms`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            auto_shutdown: Duration::ZERO,
            health_interval: Duration::from_millis(250),
            bus_capacity: 1024,
            default_interval: Duration::from_millis(100),
            handle_signals: true,
        }
    }
}
