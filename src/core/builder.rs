use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::broadcast::error::RecvError;

use super::{OrchestratorConfig, orchestrator::Orchestrator};
use crate::{
    UnitSpec,
    events::{Bus, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`Orchestrator`] with its units and subscribers.
pub struct OrchestratorBuilder {
    cfg: OrchestratorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    units: Vec<UnitSpec>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: OrchestratorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (unit lifecycle, faults, shutdown)
    /// through dedicated worker threads with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends a unit. Insertion order is construction and startup order.
    pub fn with_unit(mut self, spec: UnitSpec) -> Self {
        self.units.push(spec);
        self
    }

    /// Appends several units, keeping their order.
    pub fn with_units(mut self, specs: impl IntoIterator<Item = UnitSpec>) -> Self {
        self.units.extend(specs);
        self
    }

    /// Builds and returns the Orchestrator instance.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Subscriber workers and the listener thread feeding them
    ///
    /// Units are only recorded here; they are constructed by
    /// [`Orchestrator::instantiate`].
    pub fn build(self) -> Arc<Orchestrator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let mut subscriber_threads = Vec::new();
        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_threads = subs.thread_ids();
            match spawn_event_listener(&bus, subs) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "event listener not started; subscribers disabled");
                    None
                }
            }
        };

        Arc::new_cyclic(|this| {
            Orchestrator::new_internal(
                self.cfg,
                bus,
                self.units,
                listener,
                subscriber_threads,
                this.clone(),
            )
        })
    }
}

/// Forwards bus events to the subscriber set until `AllStopped` has been delivered.
fn spawn_event_listener(bus: &Bus, subs: SubscriberSet) -> std::io::Result<JoinHandle<()>> {
    let mut rx = bus.subscribe();
    thread::Builder::new()
        .name("tickvisor-events".into())
        .spawn(move || {
            loop {
                match rx.blocking_recv() {
                    Ok(ev) => {
                        let last = ev.kind == EventKind::AllStopped;
                        subs.emit(&ev);
                        if last {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            subs.shutdown();
        })
}
