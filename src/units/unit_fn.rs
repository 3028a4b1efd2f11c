//! # Function-backed unit (`UnitFn`)
//!
//! [`UnitFn`] wraps a closure `F: FnMut() -> Result<Progress, RuntimeError>` as the
//! unit's `repeat()` hook; the other hooks are no-ops. Shared state the closure
//! needs goes through explicit `Arc<...>` captures.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Progress, UnitFn, UnitSpec};
//!
//! let spec = UnitSpec::new("ticker", Duration::from_millis(50), || {
//!     let mut ticks = 0u64;
//!     Ok(UnitFn::boxed(move || {
//!         ticks += 1;
//!         Ok(Progress::Continue)
//!     }))
//! });
//! assert_eq!(spec.name(), "ticker");
//! ```

use crate::error::RuntimeError;
use crate::units::{Progress, TaskUnit};

/// Closure-backed task unit.
pub struct UnitFn<F> {
    f: F,
}

impl<F> UnitFn<F>
where
    F: FnMut() -> Result<Progress, RuntimeError> + Send + 'static,
{
    /// Wraps `f` as a unit.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps `f` and boxes it, ready to be returned from a unit factory.
    pub fn boxed(f: F) -> Box<dyn TaskUnit> {
        Box::new(Self::new(f))
    }
}

impl<F> TaskUnit for UnitFn<F>
where
    F: FnMut() -> Result<Progress, RuntimeError> + Send + 'static,
{
    fn repeat(&mut self) -> Result<Progress, RuntimeError> {
        (self.f)()
    }
}

impl<F> std::fmt::Debug for UnitFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitFn").finish_non_exhaustive()
    }
}
