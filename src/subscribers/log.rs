//! # LogWriter: renders events through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records.
//! Enabled by the `logging` feature (on by default); install any `tracing`
//! subscriber (for example `tracing-subscriber`'s `fmt`) to see the output.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO tickvisor: prepared unit="display" interval_ms=100
//! INFO tickvisor: running unit="display" interval_ms=100
//! WARN tickvisor: repeat failed unit="producer-1" reason="queue busy"
//! ERROR tickvisor: start failed unit="camera" reason="device busy"
//! INFO tickvisor: shutdown requested source=signal
//! INFO tickvisor: destroyed unit="display" avg_interval_ms=100
//! INFO tickvisor: all units stopped
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let unit = e.unit.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::UnitPrepared => {
                tracing::debug!(target: "tickvisor", unit, interval_ms = e.interval_ms, "prepared");
            }
            EventKind::UnitStarting => {
                tracing::debug!(target: "tickvisor", unit, "starting");
            }
            EventKind::UnitRunning => {
                tracing::info!(target: "tickvisor", unit, interval_ms = e.interval_ms, "running");
            }
            EventKind::UnitStartFailed => {
                tracing::error!(target: "tickvisor", unit, reason, "start failed");
            }
            EventKind::RepeatFailed => {
                tracing::warn!(target: "tickvisor", unit, reason, "repeat failed");
            }
            EventKind::UnitReportedDone => {
                tracing::info!(target: "tickvisor", unit, "reported done");
            }
            EventKind::UnitFaulted => {
                tracing::error!(target: "tickvisor", unit, reason, "faulted");
            }
            EventKind::UnitFinishing => {
                tracing::debug!(target: "tickvisor", unit, "finishing");
            }
            EventKind::UnitDestroyed => {
                tracing::info!(target: "tickvisor", unit, avg_interval_ms = e.interval_ms, "destroyed");
            }
            EventKind::ShutdownRequested => {
                let source = e.source.map(|s| s.as_label()).unwrap_or("-");
                tracing::info!(target: "tickvisor", source, "shutdown requested");
            }
            EventKind::AllStopped => {
                tracing::info!(target: "tickvisor", "all units stopped");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "tickvisor", subscriber = unit, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "tickvisor", subscriber = unit, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
