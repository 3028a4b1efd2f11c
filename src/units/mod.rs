//! # Task units and their building blocks.
//!
//! This module provides the unit-related types:
//! - [`TaskUnit`] - trait for a recurring unit of work (prepare / starting / repeat / finishing)
//! - [`Progress`] - advisory result of one `repeat()`
//! - [`LifecycleState`] - forward-only lifecycle state machine
//! - [`UnitSpec`] - name, interval, thread affinity and factory of one unit
//! - [`UnitFn`] - closure-backed unit
//! - [`Backing`], [`Headless`], [`FrameBudget`], [`BackingKind`] - backing-resource capability
//! - [`ResourceUnit`] - unit driving a [`Backing`], optionally fed by an [`Inbox`]
//! - [`mailbox`], [`Inbox`], [`Outbox`] - non-blocking typed message delivery

mod backing;
mod inbox;
mod resource;
mod spec;
mod state;
mod unit;
mod unit_fn;

pub use backing::{Backing, BackingKind, FrameBudget, Headless};
pub use inbox::{Inbox, Outbox, mailbox};
pub use resource::ResourceUnit;
pub use spec::{UnitFactory, UnitSpec};
pub use state::LifecycleState;
pub use unit::{Progress, TaskUnit};
pub use unit_fn::UnitFn;
