//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to multiple subscribers
//! **without waiting** for their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and reported as `SubscriberPanicked` (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for that
//!   subscriber and a `SubscriberOverflow` event is published).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► thread S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► thread S2 ─► on_event()
//!        └────────────────► [queue SN] ─► thread SN ─► on_event()
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc;

use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

/// Per-subscriber channel with metadata
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker threads.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker thread per subscriber.
    ///
    /// Each subscriber gets a bounded queue of size `max(queue_capacity, 1)`.
    /// A subscriber whose worker thread cannot be spawned is skipped with a warning.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let s = Arc::clone(&sub);
            let bus_for_worker = bus.clone();

            let spawned = thread::Builder::new()
                .name(format!("subscriber-{name}"))
                .spawn(move || {
                    while let Some(ev) = rx.blocking_recv() {
                        let res = panic::catch_unwind(AssertUnwindSafe(|| s.on_event(ev.as_ref())));
                        if let Err(panic_err) = res {
                            let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                                (*msg).to_string()
                            } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                                msg.clone()
                            } else {
                                "unknown panic".to_string()
                            };
                            bus_for_worker.publish(Event::subscriber_panicked(s.name(), info));
                        }
                    }
                });

            match spawned {
                Ok(handle) => {
                    channels.push(SubscriberChannel { name, sender: tx });
                    workers.push(handle);
                }
                Err(e) => {
                    tracing::warn!(subscriber = name, error = %e, "subscriber worker not started");
                }
            }
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Fan-out one event to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is **full** or **closed**, the event is dropped for it
    /// and a `SubscriberOverflow` event is published.
    pub fn emit(&self, event: &Event) {
        // No overflow-on-overflow.
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Graceful shutdown: close all queues and join the worker threads.
    ///
    /// Workers drain what is already queued before exiting.
    pub fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.join();
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Ids of the worker threads delivering events to subscribers.
    pub(crate) fn thread_ids(&self) -> Vec<ThreadId> {
        self.workers.iter().map(|h| h.thread().id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    impl Subscribe for Recorder {
        fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder;

    impl Subscribe for Exploder {
        fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[test]
    fn test_fan_out_preserves_per_subscriber_order() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], bus);
        assert_eq!(set.len(), 1);

        set.emit(&Event::new(EventKind::UnitPrepared));
        set.emit(&Event::new(EventKind::UnitRunning));
        set.emit(&Event::new(EventKind::UnitDestroyed));
        set.shutdown();

        assert_eq!(
            *rec.seen.lock(),
            vec![
                EventKind::UnitPrepared,
                EventKind::UnitRunning,
                EventKind::UnitDestroyed
            ]
        );
    }

    #[test]
    fn test_panicking_subscriber_is_isolated_and_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let set = SubscriberSet::new(
            vec![Arc::new(Exploder) as Arc<dyn Subscribe>, rec.clone() as _],
            bus,
        );

        set.emit(&Event::new(EventKind::AllStopped));
        set.shutdown();

        assert_eq!(*rec.seen.lock(), vec![EventKind::AllStopped]);
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert!(ev.is_for("exploder"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }
}
