//! # Typed message delivery into a unit.
//!
//! [`mailbox`] returns an [`Outbox`]/[`Inbox`] pair over an unbounded
//! [`tokio::sync::mpsc`] channel. Senders never block; the receiving unit drains
//! pending messages with [`Inbox::drain`] from inside `repeat()`, which never
//! waits, so delivery cannot stall the unit's cadence.
//!
//! ```text
//! producer unit ── Outbox::send(m) ──► [unbounded queue] ──► Inbox::drain(handler)
//!                                                              (start of each repeat)
//! ```

use tokio::sync::mpsc;

/// Creates a connected sender/receiver pair.
pub fn mailbox<M>() -> (Outbox<M>, Inbox<M>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, Inbox { rx })
}

/// Sending half; cheap to clone.
#[derive(Debug)]
pub struct Outbox<M> {
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> Outbox<M> {
    /// Queues a message. Returns `false` if the receiving unit is gone.
    pub fn send(&self, msg: M) -> bool {
        self.tx.send(msg).is_ok()
    }

    /// True once the receiving unit dropped its inbox.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by exactly one unit.
#[derive(Debug)]
pub struct Inbox<M> {
    rx: mpsc::UnboundedReceiver<M>,
}

impl<M> Inbox<M> {
    /// Hands every pending message to `handler` without waiting. Returns how many were delivered.
    pub fn drain(&mut self, mut handler: impl FnMut(M)) -> usize {
        let mut delivered = 0;
        while let Ok(msg) = self.rx.try_recv() {
            handler(msg);
            delivered += 1;
        }
        delivered
    }
}
