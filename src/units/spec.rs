//! # Unit specification.
//!
//! Defines [`UnitSpec`], the configuration bundle describing one task unit of a
//! fleet: its name, repeat interval, thread affinity, and the factory that
//! constructs it during [`Orchestrator::instantiate`](crate::Orchestrator::instantiate).
//!
//! A spec can be created:
//! - **Explicitly** with [`UnitSpec::new`] (full control)
//! - **From config** with [`UnitSpec::with_defaults`] (inherits the default interval)

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::OrchestratorConfig;
use crate::error::SetupError;
use crate::units::TaskUnit;

/// Builds a unit. Construction failures abort the whole fleet like a failed `prepare()`.
pub type UnitFactory = Box<dyn FnOnce() -> Result<Box<dyn TaskUnit>, SetupError> + Send>;

/// Specification for one task unit.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tickvisor::{Headless, OrchestratorConfig, ResourceUnit, UnitSpec};
///
/// let cfg = OrchestratorConfig::default();
/// let display = UnitSpec::with_defaults("display", &cfg, || {
///     Ok(Box::new(ResourceUnit::new(Headless::default())))
/// })
/// .on_main_thread();
///
/// assert!(display.runs_on_main_thread());
/// assert_eq!(display.interval(), Duration::from_millis(100));
/// ```
pub struct UnitSpec {
    name: Arc<str>,
    interval: Duration,
    main_thread: bool,
    factory: UnitFactory,
}

impl UnitSpec {
    /// Creates a worker-affinity spec with an explicit repeat interval.
    pub fn new<F>(name: impl Into<Arc<str>>, interval: Duration, factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn TaskUnit>, SetupError> + Send + 'static,
    {
        Self {
            name: name.into(),
            interval,
            main_thread: false,
            factory: Box::new(factory),
        }
    }

    /// Creates a worker-affinity spec using `cfg.default_interval`.
    pub fn with_defaults<F>(name: impl Into<Arc<str>>, cfg: &OrchestratorConfig, factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn TaskUnit>, SetupError> + Send + 'static,
    {
        Self::new(name, cfg.default_interval, factory)
    }

    /// Requires the unit to run on the thread that calls `Orchestrator::start()`.
    pub fn on_main_thread(mut self) -> Self {
        self.main_thread = true;
        self
    }

    /// Returns a new spec with updated repeat interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Repeat interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True if the unit owns the calling thread.
    pub fn runs_on_main_thread(&self) -> bool {
        self.main_thread
    }

    pub(crate) fn into_parts(self) -> (Arc<str>, Duration, bool, UnitFactory) {
        (self.name, self.interval, self.main_thread, self.factory)
    }
}

impl fmt::Debug for UnitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitSpec")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("main_thread", &self.main_thread)
            .finish_non_exhaustive()
    }
}
