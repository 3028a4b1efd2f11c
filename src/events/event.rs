//! # Runtime events emitted by the orchestrator and unit slots.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Unit lifecycle**: prepare, start, repeat failures, faults, teardown
//! - **Orchestration**: shutdown requested, everything stopped
//! - **Subscriber health**: overflow, panic
//!
//! The [`Event`] struct carries the metadata: timestamp, unit name, lifecycle
//! state, reason, measured interval and shutdown source.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Event, EventKind, LifecycleState};
//!
//! let ev = Event::new(EventKind::UnitStartFailed)
//!     .with_unit("display")
//!     .with_state(LifecycleState::Starting)
//!     .with_reason("no surface");
//!
//! assert_eq!(ev.kind, EventKind::UnitStartFailed);
//! assert_eq!(ev.unit.as_deref(), Some("display"));
//! assert_eq!(ev.state, Some(LifecycleState::Starting));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::units::LifecycleState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `unit`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `unit`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Orchestration events ===
    /// Stop was requested and won the race.
    ///
    /// Sets:
    /// - `source`: who asked (signal, timeout, manual)
    ShutdownRequested,

    /// Every unit reached `Destroyed`; the orchestrator is stopped.
    AllStopped,

    // === Unit lifecycle events ===
    /// Unit constructed and prepared.
    ///
    /// Sets:
    /// - `unit`, `state` (= `Prepared`)
    /// - `interval_ms`: configured repeat interval
    UnitPrepared,

    /// Unit is acquiring its backing resource.
    ///
    /// Sets:
    /// - `unit`, `state` (= `Starting`)
    UnitStarting,

    /// Unit entered its repeat loop.
    ///
    /// Sets:
    /// - `unit`, `state` (= `Running`)
    /// - `interval_ms`: repeat interval
    UnitRunning,

    /// `starting()` failed; the unit is torn down without entering its loop.
    ///
    /// Sets:
    /// - `unit`, `state` (= `Starting`)
    /// - `reason`: startup error
    UnitStartFailed,

    /// A single `repeat()` invocation failed.
    ///
    /// Sets:
    /// - `unit`, `state`
    /// - `reason`: runtime error
    RepeatFailed,

    /// `repeat()` returned `Done` for the first time (advisory; the schedule keeps running).
    ///
    /// Sets:
    /// - `unit`, `state`
    UnitReportedDone,

    /// Unit stopped individually (unrecoverable error or dead schedule thread).
    ///
    /// Sets:
    /// - `unit`, `state`
    /// - `reason`: fault description
    UnitFaulted,

    /// `finishing()` is about to run.
    ///
    /// Sets:
    /// - `unit`, `state` (= `Finishing`)
    UnitFinishing,

    /// Unit reached its terminal state.
    ///
    /// Sets:
    /// - `unit`, `state` (= `Destroyed`)
    /// - `interval_ms`: average measured repeat interval, if any tick happened
    UnitDestroyed,
}

/// Who triggered a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    /// OS termination signal.
    Signal,
    /// Auto-shutdown timer elapsed.
    Timeout,
    /// Explicit call by the owner.
    Manual,
}

impl StopSource {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StopSource::Signal => "signal",
            StopSource::Timeout => "timeout",
            StopSource::Manual => "manual",
        }
    }
}

impl fmt::Display for StopSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the unit (or subscriber), if applicable.
    pub unit: Option<Arc<str>>,
    /// Lifecycle state of the unit when the event was emitted.
    pub state: Option<LifecycleState>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Interval in milliseconds (compact): configured or measured, see [`EventKind`].
    pub interval_ms: Option<u32>,
    /// Origin of a shutdown request.
    pub source: Option<StopSource>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            unit: None,
            state: None,
            reason: None,
            interval_ms: None,
            source: None,
        }
    }

    /// Attaches a unit name.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches the unit's lifecycle state.
    #[inline]
    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an interval (stored as milliseconds).
    #[inline]
    pub fn with_interval(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.interval_ms = Some(ms);
        self
    }

    /// Attaches the origin of a shutdown request.
    #[inline]
    pub fn with_source(mut self, source: StopSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_unit(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_unit(subscriber)
            .with_reason(info)
    }

    /// True if the event concerns the named unit.
    #[inline]
    pub fn is_for(&self, unit: &str) -> bool {
        self.unit.as_deref() == Some(unit)
    }
}
