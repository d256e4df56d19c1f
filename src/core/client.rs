//! Client identity and the registration record kept by the event loop.

use std::collections::HashSet;

use tokio::sync::mpsc;
use ulid::Ulid;

use crate::event::Payload;

/// Opaque per-connection identity, minted once at `Join` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Ulid);

impl ClientId {
    pub fn new() -> Self {
        ClientId(Ulid::new())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outbox sender half, handed to a newly joined client so its adapter
/// task can construct the receiving stream before `Join` is even enqueued.
pub type OutboxSender = mpsc::Sender<Payload>;
pub type OutboxReceiver = mpsc::Receiver<Payload>;

/// The default bound on a client's outbox. Past this many unconsumed
/// payloads the event loop treats the client as a slow consumer (§5).
pub const OUTBOX_CAPACITY: usize = 64;

pub fn outbox_channel() -> (OutboxSender, OutboxReceiver) {
    mpsc::channel(OUTBOX_CAPACITY)
}

/// Which protocol adapter a client joined through (§2.9, §4.3/§4.4) — the
/// event loop uses this to credit the right per-protocol connection gauge
/// instead of one undifferentiated counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Sse,
    Native,
}

/// What the event loop keeps per registered client: the outbox it owns the
/// producing half of, and the subscription set driving bucket membership.
pub struct ClientEntry {
    pub outbox: OutboxSender,
    pub subscriptions: HashSet<String>,
    pub kind: ClientKind,
}
