//! The single-writer event loop: the only task that ever touches the
//! subscription index (§4.1, §5). Everything else talks to it through
//! [`EventLoopHandle`], which just enqueues commands.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::event::{self, Payload};
use crate::metrics::Metrics;

use super::client::{outbox_channel, ClientEntry, ClientId, ClientKind, OutboxReceiver, OutboxSender};
use super::index::SubscriptionIndex;

/// Bound on the command intake. Large relative to outbox capacity: the
/// intake backpressures producers rather than ever dropping a command
/// (§4.1 "commands are never dropped").
const INTAKE_CAPACITY: usize = 1024;

pub enum Command {
    Join {
        id: ClientId,
        kind: ClientKind,
        subscriptions: HashSet<String>,
        outbox: OutboxSender,
    },
    Leave {
        id: ClientId,
    },
    Replace {
        id: ClientId,
        subscriptions: HashSet<String>,
    },
    Publish {
        payload: Payload,
    },
    Shutdown,
}

/// A cheaply-cloned front door onto the event loop. Every adapter and
/// upstream driver task holds one of these rather than ever touching the
/// index directly.
#[derive(Clone)]
pub struct EventLoopHandle {
    tx: mpsc::Sender<Command>,
}

impl EventLoopHandle {
    /// Registers a new client and returns the receiving half of its outbox.
    /// Returns `None` if the loop has already shut down.
    pub async fn join(
        &self,
        kind: ClientKind,
        subscriptions: HashSet<String>,
    ) -> Option<(ClientId, OutboxReceiver)> {
        let id = ClientId::new();
        let (outbox, rx) = outbox_channel();
        self.tx
            .send(Command::Join {
                id,
                kind,
                subscriptions,
                outbox,
            })
            .await
            .ok()?;
        Some((id, rx))
    }

    pub async fn leave(&self, id: ClientId) {
        let _ = self.tx.send(Command::Leave { id }).await;
    }

    /// Synchronous best-effort variant for use from `Drop` impls, which
    /// cannot `.await`. Fails silently if the intake is momentarily full or
    /// the loop has shut down — acceptable since a dropped connection's
    /// outbox will also be dropped, which the loop observes on next publish.
    pub fn leave_now(&self, id: ClientId) {
        let _ = self.tx.try_send(Command::Leave { id });
    }

    pub async fn replace(&self, id: ClientId, subscriptions: HashSet<String>) {
        let _ = self.tx.send(Command::Replace { id, subscriptions }).await;
    }

    pub async fn publish(&self, payload: Payload) {
        let _ = self.tx.send(Command::Publish { payload }).await;
    }

    /// Non-blocking variant used by the PubSub bus's synchronous handler
    /// callback (§4.5), which cannot `.await`. The command intake is sized
    /// generously (§4.1) so this only drops under sustained, severe load.
    pub fn publish_now(&self, payload: Payload) {
        let _ = self.tx.try_send(Command::Publish { payload });
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }
}

pub struct EventLoop {
    index: SubscriptionIndex,
    clients: HashMap<ClientId, ClientEntry>,
    intake: mpsc::Receiver<Command>,
    metrics: Metrics,
}

impl EventLoop {
    pub fn new(metrics: Metrics) -> (Self, EventLoopHandle) {
        let (tx, rx) = mpsc::channel(INTAKE_CAPACITY);
        let loop_ = EventLoop {
            index: SubscriptionIndex::new(),
            clients: HashMap::new(),
            intake: rx,
            metrics,
        };
        (loop_, EventLoopHandle { tx })
    }

    /// Runs until a [`Command::Shutdown`] is processed or every handle is
    /// dropped. Consumes `self`: there is exactly one loop per process.
    pub async fn run(mut self) {
        while let Some(command) = self.intake.recv().await {
            match command {
                Command::Join {
                    id,
                    kind,
                    subscriptions,
                    outbox,
                } => self.handle_join(id, kind, subscriptions, outbox),
                Command::Leave { id } => self.handle_leave(id),
                Command::Replace { id, subscriptions } => self.handle_replace(id, subscriptions),
                Command::Publish { payload } => self.handle_publish(payload),
                Command::Shutdown => break,
            }
        }
        debug!(clients = self.clients.len(), "event loop shutting down, closing all outboxes");
        self.clients.clear();
    }

    fn handle_join(&mut self, id: ClientId, kind: ClientKind, subscriptions: HashSet<String>, outbox: OutboxSender) {
        for key in &subscriptions {
            self.index.add(key, id);
        }
        self.clients.insert(
            id,
            ClientEntry {
                outbox,
                subscriptions,
                kind,
            },
        );
        match kind {
            ClientKind::Sse => self.metrics.sse_clients.inc(),
            ClientKind::Native => self.metrics.native_clients.inc(),
        }
        self.metrics.index_buckets.set(self.index.bucket_count() as i64);
        trace!(%id, ?kind, "client joined");
    }

    fn handle_leave(&mut self, id: ClientId) {
        if let Some(entry) = self.clients.remove(&id) {
            for key in &entry.subscriptions {
                self.index.remove(key, id);
            }
            match entry.kind {
                ClientKind::Sse => self.metrics.sse_clients.dec(),
                ClientKind::Native => self.metrics.native_clients.dec(),
            }
            self.metrics.index_buckets.set(self.index.bucket_count() as i64);
            trace!(%id, "client left");
        }
        // Second `Leave` for an already-removed client is a no-op — idempotent by construction.
    }

    fn handle_replace(&mut self, id: ClientId, new_subs: HashSet<String>) {
        let Some(entry) = self.clients.get_mut(&id) else {
            return;
        };
        let old_subs = std::mem::replace(&mut entry.subscriptions, new_subs.clone());
        if old_subs == new_subs {
            return;
        }
        for key in old_subs.difference(&new_subs) {
            self.index.remove(key, id);
        }
        for key in new_subs.difference(&old_subs) {
            self.index.add(key, id);
        }
        self.metrics.index_buckets.set(self.index.bucket_count() as i64);
        trace!(%id, subs = new_subs.len(), "client replaced subscriptions");
    }

    fn handle_publish(&mut self, payload: Payload) {
        let prefixes = event::prefixes(payload.event_type());
        let mut evict = Vec::new();
        for prefix in &prefixes {
            for client_id in self.index.get(prefix).collect::<Vec<_>>() {
                let Some(entry) = self.clients.get(&client_id) else {
                    continue;
                };
                match entry.outbox.try_send(payload.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(client = %client_id, "outbox full, evicting slow consumer");
                        evict.push(client_id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        evict.push(client_id);
                    }
                }
            }
        }
        for client_id in evict {
            self.handle_leave(client_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_loop() -> (EventLoopHandle, tokio::task::JoinHandle<()>) {
        let (event_loop, handle) = EventLoop::new(Metrics::new_for_test());
        let join = tokio::spawn(event_loop.run());
        (handle, join)
    }

    #[tokio::test]
    async fn prefix_routing_multiplicity() {
        let (handle, _join) = spawn_loop().await;
        let subs: HashSet<String> = ["program:1234".to_string(), "program:1234:views".to_string()]
            .into_iter()
            .collect();
        let (_id, mut rx) = handle.join(ClientKind::Sse, subs).await.unwrap();

        handle
            .publish(Payload::new("program:1234:views", "55301"))
            .await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "program:1234:views");
        assert_eq!(second.event_type(), "program:1234:views");
    }

    #[tokio::test]
    async fn leave_closes_the_outbox() {
        let (handle, _join) = spawn_loop().await;
        let (id, mut rx) = handle.join(ClientKind::Sse, HashSet::new()).await.unwrap();
        handle.leave(id).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn leave_twice_is_idempotent() {
        let (handle, _join) = spawn_loop().await;
        let (id, _rx) = handle.join(ClientKind::Sse, HashSet::new()).await.unwrap();
        handle.leave(id).await;
        handle.leave(id).await;
    }

    #[tokio::test]
    async fn replace_moves_bucket_membership() {
        let (handle, _join) = spawn_loop().await;
        let mut subs = HashSet::new();
        subs.insert("a".to_string());
        let (id, mut rx) = handle.join(ClientKind::Sse, subs).await.unwrap();

        let mut replacement = HashSet::new();
        replacement.insert("b".to_string());
        handle.replace(id, replacement).await;

        handle.publish(Payload::new("a", "")).await;
        handle.publish(Payload::new("b", "hit")).await;

        let got = rx.recv().await.unwrap();
        assert_eq!(got.event_type(), "b");
    }

    #[tokio::test]
    async fn replace_with_empty_set_does_not_close_outbox() {
        let (handle, _join) = spawn_loop().await;
        let mut subs = HashSet::new();
        subs.insert("a".to_string());
        let (id, mut rx) = handle.join(ClientKind::Sse, subs).await.unwrap();

        handle.replace(id, HashSet::new()).await;
        handle.publish(Payload::new("a", "")).await;
        handle.publish(Payload::new("keepalive-check", "")).await;

        // The outbox is still open (not closed by Replace) but receives
        // nothing because no bucket membership matches any more.
        assert_eq!(rx.try_recv(), Err(tokio::sync::mpsc::error::TryRecvError::Empty));

        handle.leave(id).await;
        assert!(rx.recv().await.is_none());
    }
}
