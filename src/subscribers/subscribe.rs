//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into the
//! runtime. Each subscriber is driven by a dedicated worker thread fed by a bounded
//! queue that is owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, retries); they do **not** block
//!   the publisher, the unit schedules, nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped** and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Event, EventKind, Subscribe};
//!
//! struct FaultCounter(std::sync::atomic::AtomicU64);
//!
//! impl Subscribe for FaultCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::UnitFaulted {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "fault-counter" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker thread, never from a unit's schedule.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
