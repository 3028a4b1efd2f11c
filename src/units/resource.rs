//! # ResourceUnit: a task unit driving an injected [`Backing`].
//!
//! ```text
//! starting()  ─► backing.setup()              (SetupError → StartupError)
//! repeat()    ─► inbox.drain(handler)          (non-blocking)
//!             ─► backing.perform()             (Continue | Done | RuntimeError)
//! finishing() ─► backing.teardown()            (only if setup was attempted)
//! ```

use std::fmt;

use crate::error::{RuntimeError, StartupError};
use crate::units::{Backing, Inbox, Progress, TaskUnit};

type Handler<M> = Box<dyn FnMut(M) + Send>;

/// Task unit whose work is performed by a backing resource, optionally fed by an [`Inbox`].
pub struct ResourceUnit<M = ()> {
    backing: Box<dyn Backing>,
    inbox: Option<(Inbox<M>, Handler<M>)>,
    acquired: bool,
    received: u64,
}

impl ResourceUnit<()> {
    /// Creates a unit around `backing` with no inbox.
    pub fn new(backing: impl Backing) -> Self {
        Self::from_boxed(Box::new(backing))
    }

    /// Creates a unit around an already boxed backing (see [`BackingKind::build`](crate::BackingKind::build)).
    pub fn from_boxed(backing: Box<dyn Backing>) -> Self {
        Self {
            backing,
            inbox: None,
            acquired: false,
            received: 0,
        }
    }
}

impl<M: Send + 'static> ResourceUnit<M> {
    /// Creates a unit that hands inbound messages to `handler` before each unit of work.
    pub fn with_inbox<H>(backing: Box<dyn Backing>, inbox: Inbox<M>, handler: H) -> Self
    where
        H: FnMut(M) + Send + 'static,
    {
        Self {
            backing,
            inbox: Some((inbox, Box::new(handler))),
            acquired: false,
            received: 0,
        }
    }

    /// Messages delivered so far.
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl<M: Send + 'static> TaskUnit for ResourceUnit<M> {
    fn starting(&mut self) -> Result<(), StartupError> {
        self.acquired = true;
        tracing::info!(backing = self.backing.kind(), "acquiring backing resource");
        self.backing
            .setup()
            .map_err(|e| StartupError::new(e.reason))
    }

    fn repeat(&mut self) -> Result<Progress, RuntimeError> {
        if let Some((inbox, handler)) = self.inbox.as_mut() {
            self.received += inbox.drain(handler) as u64;
        }
        self.backing.perform()
    }

    fn finishing(&mut self) {
        if self.acquired {
            tracing::info!(backing = self.backing.kind(), "releasing backing resource");
            self.backing.teardown();
        }
    }
}

impl<M> fmt::Debug for ResourceUnit<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceUnit")
            .field("backing", &self.backing.kind())
            .field("inbox", &self.inbox.is_some())
            .field("acquired", &self.acquired)
            .field("received", &self.received)
            .finish()
    }
}
