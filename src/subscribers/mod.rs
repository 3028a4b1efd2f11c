//! # Event subscribers for the tickvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   UnitSlot ── publish(Event) ──► Bus ──► listener thread ──► SubscriberSet::emit
//!                                                                  │
//!                                                   ┌──────────────┼──────────┐
//!                                                   ▼              ▼          ▼
//!                                               LogWriter       Metrics    Custom
//!                                            (own thread)    (own thread) (own thread)
//! ```
//!
//! - **Passive subscribers** observe and react (logging, metrics, alerts).
//! - Subscribers never run on a unit's schedule thread, so a slow subscriber
//!   cannot disturb any cadence.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
