//! Transport links between execution contexts.
//!
//! Two shapes exist: a process-wide multicast bus shared by every context
//! that attaches to it, and direct peer links modeled on window handles.
//! Both are fire-and-forget; messages to closed or not-yet-open contexts
//! are dropped without error.

use tokio::sync::{broadcast, mpsc};

use crate::command::{Envelope, OriginId};

// ── Arrival ──────────────────────────────────────────────────────

/// Which link an inbound envelope arrived on. Used by the hub to exclude
/// that link when forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrival {
    Broadcast,
    /// Direct message from the context with this id.
    Peer(OriginId),
}

// ── Multicast bus ────────────────────────────────────────────────

/// Handle to a process-wide multicast bus.
///
/// Delivery is at-most-once per attached listener, unordered across
/// contexts, with no persistence: a context that attaches later never
/// sees earlier traffic.
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach a new listener. The returned link both sends and receives.
    pub fn attach(&self) -> BroadcastLink {
        BroadcastLink {
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

/// One context's attachment to the bus. Dropping it detaches the context.
#[derive(Debug)]
pub struct BroadcastLink {
    tx: broadcast::Sender<Envelope>,
    rx: broadcast::Receiver<Envelope>,
}

impl BroadcastLink {
    /// Fire-and-forget send. Zero current listeners is not a failure;
    /// the bus itself accepted the message.
    pub fn send(&self, envelope: &Envelope) -> bool {
        let _ = self.tx.send(envelope.clone());
        true
    }

    /// Next pending envelope, if any. Lagged slots are skipped with a
    /// warning rather than surfaced as errors.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "broadcast listener lagged; dropping old traffic");
                }
                Err(_) => return None,
            }
        }
    }
}

// ── Direct links ─────────────────────────────────────────────────

/// A direct message as it sits in a context's mailbox: the envelope plus
/// the sending context's id, so the receiver knows the arrival link.
#[derive(Debug, Clone)]
pub struct DirectMessage {
    pub envelope: Envelope,
    pub from: OriginId,
}

/// Capability to post messages into another context's mailbox.
///
/// Obtained from [`Mailbox::handle`] on the target context and handed to
/// the peer, the way a window handle is handed to its opener.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    context_id: OriginId,
    tx: mpsc::UnboundedSender<DirectMessage>,
}

impl PeerHandle {
    pub fn context_id(&self) -> &OriginId {
        &self.context_id
    }
}

/// A direct link owned by exactly one context, pointing at one peer.
///
/// The owner must call [`is_live`](Self::is_live) immediately before each
/// send; a dead link must be dropped (nulled out), never retried.
#[derive(Debug)]
pub struct DirectLink {
    handle: PeerHandle,
}

impl DirectLink {
    pub fn new(handle: PeerHandle) -> Self {
        Self { handle }
    }

    pub fn peer_id(&self) -> &OriginId {
        &self.handle.context_id
    }

    /// Whether the peer's mailbox still exists. Valid only for the
    /// current event-loop turn; never cache this across turns.
    pub fn is_live(&self) -> bool {
        !self.handle.tx.is_closed()
    }

    /// Post into the peer's mailbox. `false` means the peer is gone.
    pub fn send(&self, envelope: &Envelope, from: &OriginId) -> bool {
        self.handle
            .tx
            .send(DirectMessage {
                envelope: envelope.clone(),
                from: from.clone(),
            })
            .is_ok()
    }
}

// ── Mailbox ──────────────────────────────────────────────────────

/// A context's inbound queue for direct messages.
#[derive(Debug)]
pub struct Mailbox {
    tx: mpsc::UnboundedSender<DirectMessage>,
    rx: mpsc::UnboundedReceiver<DirectMessage>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A handle peers can use to reach this mailbox.
    pub fn handle(&self, context_id: &OriginId) -> PeerHandle {
        PeerHandle {
            context_id: context_id.clone(),
            tx: self.tx.clone(),
        }
    }

    pub fn try_recv(&mut self) -> Option<DirectMessage> {
        self.rx.try_recv().ok()
    }
}
