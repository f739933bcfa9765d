//! Per-context session state: the origin id, the set of live transport
//! links, and the bookkeeping the hub needs for dedup and field
//! re-derivation.
//!
//! One `SessionContext` exists per execution context. It is constructed at
//! context start, passed explicitly (never a global), and torn down by
//! [`close`](SessionContext::close), which drops every transport.

use crate::color::Xyz;
use crate::command::{Command, Envelope, OriginId};
use crate::transport::{Arrival, BroadcastBus, BroadcastLink, DirectLink, Mailbox, PeerHandle};

// ── SessionContext ───────────────────────────────────────────────

#[derive(Debug)]
pub struct SessionContext {
    origin_id: OriginId,
    mailbox: Mailbox,
    bus: Option<BroadcastLink>,
    peers: Vec<DirectLink>,
    /// Origin and command of the envelope most recently applied here,
    /// used to drop the second copy when one command reaches us over two
    /// links at once.
    last_applied: Option<(OriginId, Command)>,
    /// Pivot value of the most recently applied color, kept so control
    /// fields can be re-rendered when the operator switches space/mode.
    last_pivot: Option<Xyz>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// A fresh context with a newly generated origin id and no links.
    pub fn new() -> Self {
        Self {
            origin_id: OriginId::generate(),
            mailbox: Mailbox::new(),
            bus: None,
            peers: Vec::new(),
            last_applied: None,
            last_pivot: None,
        }
    }

    pub fn origin_id(&self) -> &OriginId {
        &self.origin_id
    }

    // ── Links ────────────────────────────────────────────────────

    /// A handle other contexts can use to direct-link to this one.
    pub fn handle(&self) -> PeerHandle {
        self.mailbox.handle(&self.origin_id)
    }

    /// Attach to a multicast bus. Replaces any previous attachment.
    pub fn join_bus(&mut self, bus: &BroadcastBus) {
        self.bus = Some(bus.attach());
    }

    /// Hold a direct link to a peer context.
    pub fn link_peer(&mut self, handle: PeerHandle) {
        self.peers.push(DirectLink::new(handle));
    }

    pub fn on_bus(&self) -> bool {
        self.bus.is_some()
    }

    /// Direct links currently held (dead ones are cleared on dispatch).
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn has_links(&self) -> bool {
        self.bus.is_some() || !self.peers.is_empty()
    }

    /// Tear down: close every transport. The context keeps its id but can
    /// no longer reach or be reached by peers through dropped links.
    pub fn close(&mut self) {
        self.bus = None;
        self.peers.clear();
    }

    // ── Dedup / pivot bookkeeping ────────────────────────────────

    pub(crate) fn is_duplicate(&self, envelope: &Envelope) -> bool {
        self.last_applied
            .as_ref()
            .is_some_and(|(origin, command)| {
                *origin == envelope.origin_id && *command == envelope.command
            })
    }

    pub(crate) fn note_applied(&mut self, envelope: &Envelope) {
        self.last_applied = Some((envelope.origin_id.clone(), envelope.command.clone()));
    }

    pub fn last_pivot(&self) -> Option<Xyz> {
        self.last_pivot
    }

    pub(crate) fn remember_pivot(&mut self, pivot: Xyz) {
        self.last_pivot = Some(pivot);
    }

    // ── Dispatch / inbound ───────────────────────────────────────

    /// Send on every live link except the excluded arrival link.
    ///
    /// Dead peer handles found along the way are cleared so later sends
    /// never retry them. Returns `true` iff at least one link accepted
    /// the envelope.
    pub(crate) fn dispatch(&mut self, envelope: &Envelope, exclude: Option<&Arrival>) -> bool {
        let mut delivered = false;

        if let Some(bus) = &self.bus {
            if exclude != Some(&Arrival::Broadcast) {
                delivered |= bus.send(envelope);
            }
        }

        // Liveness is checked per send, never cached across turns.
        self.peers.retain(|peer| {
            if peer.is_live() {
                true
            } else {
                tracing::debug!(peer = %peer.peer_id(), "peer closed; clearing handle");
                false
            }
        });

        for peer in &self.peers {
            if let Some(Arrival::Peer(from)) = exclude {
                if from == peer.peer_id() {
                    continue;
                }
            }
            if peer.send(envelope, &self.origin_id) {
                delivered = true;
            }
        }

        delivered
    }

    /// Pull the next pending inbound envelope, bus traffic first.
    pub(crate) fn next_inbound(&mut self) -> Option<(Envelope, Arrival)> {
        if let Some(bus) = &mut self.bus {
            if let Some(envelope) = bus.try_recv() {
                return Some((envelope, Arrival::Broadcast));
            }
        }
        self.mailbox
            .try_recv()
            .map(|msg| (msg.envelope, Arrival::Peer(msg.from)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(origin: &str, css: &str) -> Envelope {
        Envelope::local(Command::Color(css.into()), origin.into())
    }

    #[test]
    fn fresh_context_has_no_links() {
        let ctx = SessionContext::new();
        assert!(!ctx.has_links());
        assert_eq!(ctx.peer_count(), 0);
        assert!(!ctx.on_bus());
    }

    #[test]
    fn dispatch_with_no_links_reports_undelivered() {
        let mut ctx = SessionContext::new();
        assert!(!ctx.dispatch(&envelope("o", "#FFF"), None));
    }

    #[test]
    fn dead_peer_is_cleared_on_dispatch() {
        let mut ctx = SessionContext::new();
        let peer = SessionContext::new();
        ctx.link_peer(peer.handle());
        assert_eq!(ctx.peer_count(), 1);

        drop(peer);
        assert!(!ctx.dispatch(&envelope("o", "#FFF"), None));
        assert_eq!(ctx.peer_count(), 0);
    }

    #[test]
    fn dispatch_excludes_the_arrival_peer() {
        let mut sender = SessionContext::new();
        let mut peer = SessionContext::new();
        let mut other = SessionContext::new();
        sender.link_peer(peer.handle());
        sender.link_peer(other.handle());

        let came_from = Arrival::Peer(peer.origin_id().clone());
        assert!(sender.dispatch(&envelope("o", "#FFF"), Some(&came_from)));
        assert!(peer.next_inbound().is_none());
        assert!(other.next_inbound().is_some());
    }

    #[test]
    fn duplicate_detection_keys_on_origin_and_command() {
        let mut ctx = SessionContext::new();
        let env = envelope("o", "#ABCDEF");
        ctx.note_applied(&env);

        assert!(ctx.is_duplicate(&env));
        // Same command from the forwarded copy still counts.
        assert!(ctx.is_duplicate(&env.forwarded()));
        // Different value or different origin does not.
        assert!(!ctx.is_duplicate(&envelope("o", "#000000")));
        assert!(!ctx.is_duplicate(&envelope("other", "#ABCDEF")));
    }

    #[test]
    fn close_drops_all_links() {
        let bus = BroadcastBus::new(8);
        let mut ctx = SessionContext::new();
        let peer = SessionContext::new();
        ctx.join_bus(&bus);
        ctx.link_peer(peer.handle());
        assert!(ctx.has_links());

        ctx.close();
        assert!(!ctx.has_links());
    }
}
