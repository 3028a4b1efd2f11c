//! # Backing-resource capability.
//!
//! A [`Backing`] is the external resource a unit acquires in `starting()` and
//! releases in `finishing()` (a display surface, a device handle, a socket).
//! The runtime never inspects it; a [`ResourceUnit`](crate::ResourceUnit) only
//! drives the three-operation contract:
//!
//! ```text
//! setup() ──► perform() … perform() ──► teardown()
//!  Ready        Continue | Done
//! ```
//!
//! Variants are plain implementations selected by configuration through
//! [`BackingKind`], not by inheritance.

use crate::error::{RuntimeError, SetupError};
use crate::units::Progress;

/// Three-operation contract of a unit's backing resource.
pub trait Backing: Send + 'static {
    /// Acquires the resource.
    fn setup(&mut self) -> Result<(), SetupError>;

    /// Performs one unit of work on the acquired resource.
    fn perform(&mut self) -> Result<Progress, RuntimeError>;

    /// Releases the resource. Must tolerate a failed or partial `setup()`.
    fn teardown(&mut self);

    /// Short name used in logs.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A resource with nothing to acquire; every unit of work succeeds.
#[derive(Debug, Default, Clone)]
pub struct Headless {
    frames: u64,
}

impl Headless {
    /// Units of work performed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Backing for Headless {
    fn setup(&mut self) -> Result<(), SetupError> {
        Ok(())
    }

    fn perform(&mut self) -> Result<Progress, RuntimeError> {
        self.frames += 1;
        Ok(Progress::Continue)
    }

    fn teardown(&mut self) {}

    fn kind(&self) -> &'static str {
        "headless"
    }
}

/// A surface that reports [`Progress::Done`] once `limit` frames were drawn,
/// the way a window reports that it was closed.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    limit: u64,
    drawn: u64,
    open: bool,
}

impl FrameBudget {
    /// Creates a surface that closes after `limit` frames.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            drawn: 0,
            open: false,
        }
    }

    /// Frames drawn so far.
    pub fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl Backing for FrameBudget {
    fn setup(&mut self) -> Result<(), SetupError> {
        self.open = true;
        Ok(())
    }

    fn perform(&mut self) -> Result<Progress, RuntimeError> {
        if !self.open {
            return Err(RuntimeError::unrecoverable("surface is not open"));
        }
        if self.drawn >= self.limit {
            return Ok(Progress::Done);
        }
        self.drawn += 1;
        Ok(Progress::Continue)
    }

    fn teardown(&mut self) {
        self.open = false;
    }

    fn kind(&self) -> &'static str {
        "frame_budget"
    }
}

/// Configuration-level selector for the built-in backing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackingKind {
    /// [`Headless`].
    #[default]
    Headless,
    /// [`FrameBudget`] closing after the given number of frames.
    FrameBudget(u64),
}

impl BackingKind {
    /// Builds the selected backing.
    pub fn build(self) -> Box<dyn Backing> {
        match self {
            BackingKind::Headless => Box::new(Headless::default()),
            BackingKind::FrameBudget(limit) => Box::new(FrameBudget::new(limit)),
        }
    }
}
