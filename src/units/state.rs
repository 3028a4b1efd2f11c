//! # Task-unit lifecycle state machine.
//!
//! ```text
//! Constructed ─prepare()─► Prepared ─starting()─► Starting ─ok─► Running ─┐
//!      │                      │                      │                    │ repeat() per tick
//!      │                      │                      │                    ◄┘
//!      └──────────────────────┴──────────┬───────────┴────────────────────┘
//!                                        ▼ finishing()
//!                                    Finishing ──► Destroyed
//! ```
//!
//! ## Rules
//! - States only move **forward**; no transition skips `Starting → Running`.
//! - `Finishing` is reachable from every live state, so `finishing()` runs
//!   before `Destroyed` no matter where the unit stopped (setup abort, failed
//!   startup, fleet stop).

use std::fmt;

/// Lifecycle position of a task unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Built by its factory, not prepared yet.
    Constructed,
    /// `prepare()` succeeded: cadence set, clock running.
    Prepared,
    /// `starting()` is acquiring the backing resource.
    Starting,
    /// The repeat loop is live.
    Running,
    /// `finishing()` is releasing the backing resource.
    Finishing,
    /// Torn down; terminal.
    Destroyed,
}

impl LifecycleState {
    /// Whether `self → next` is a legal forward transition.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Constructed, Prepared)
                | (Prepared, Starting)
                | (Starting, Running)
                | (Constructed | Prepared | Starting | Running, Finishing)
                | (Finishing, Destroyed)
        )
    }

    /// True once teardown has begun.
    pub fn is_terminating(self) -> bool {
        matches!(self, LifecycleState::Finishing | LifecycleState::Destroyed)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            LifecycleState::Constructed => "constructed",
            LifecycleState::Prepared => "prepared",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Finishing => "finishing",
            LifecycleState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
