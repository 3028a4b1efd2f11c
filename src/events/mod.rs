//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the orchestrator, unit slots
//! and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`StopSource`] origin of a shutdown request
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Orchestrator` (shutdown, faults), `UnitSlot` (lifecycle, repeat
//!   failures), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the orchestrator's listener thread (fans out to `SubscriberSet`),
//!   and anyone holding a receiver from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, StopSource};
