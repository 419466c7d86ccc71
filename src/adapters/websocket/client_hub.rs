//! Hub of local subscriber sessions.
//!
//! All mutation of the session set happens inside one task that drains a
//! FIFO command queue, so registrations and broadcasts are totally ordered
//! without a lock on the set.
//!
//! # Architecture
//!
//! ```text
//! handler / BrokerHub ──register/unregister/broadcast──▶ [queue] ──▶ hub task
//!                                                                  ├── client-a (mpsc)
//!                                                                  ├── client-b (mpsc)
//!                                                                  └── client-c (mpsc)
//! ```
//!
//! Delivery into a session's outbound queue never waits. A session whose
//! queue is closed or full is evicted, and the remaining sessions receive a
//! single "unreachable" notice for that pass.

use std::collections::HashMap;
use std::future;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

use super::messages::Message;

/// Unique identifier for a subscriber connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
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

/// A live subscriber connection as seen by the hub.
#[derive(Debug, Clone)]
pub struct ClientSession {
    id: ClientId,
    remote_addr: String,
    outbound: mpsc::Sender<Message>,
}

impl ClientSession {
    /// Creates a session and the receiving end of its outbound queue.
    pub fn channel(remote_addr: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        let session = Self {
            id: ClientId::new(),
            remote_addr: remote_addr.into(),
            outbound,
        };
        (session, rx)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    fn deliver(&self, message: &Message) -> bool {
        self.outbound.try_send(message.clone()).is_ok()
    }
}

enum ClientHubCommand {
    Register(ClientSession),
    Unregister(ClientId),
    Broadcast(Message),
    Snapshot(oneshot::Sender<Vec<ClientId>>),
}

/// Handle to the subscriber hub task.
///
/// Cheap to clone. Every method only enqueues a request.
#[derive(Debug, Clone)]
pub struct ClientHub {
    commands: mpsc::UnboundedSender<ClientHubCommand>,
}

impl std::fmt::Debug for ClientHubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientHubCommand::Register(s) => write!(f, "Register({})", s.id),
            ClientHubCommand::Unregister(id) => write!(f, "Unregister({})", id),
            ClientHubCommand::Broadcast(_) => write!(f, "Broadcast"),
            ClientHubCommand::Snapshot(_) => write!(f, "Snapshot"),
        }
    }
}

impl ClientHub {
    /// Spawns the hub task on the current runtime.
    ///
    /// With a `probe_interval`, every session receives a liveness probe on
    /// that period and sessions that cannot take it are evicted.
    pub fn spawn(probe_interval: Option<Duration>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let probe = probe_interval.map(|period| {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        tokio::spawn(ClientHubTask::default().run(rx, probe));
        Self { commands }
    }

    pub fn register(&self, session: ClientSession) {
        self.enqueue(ClientHubCommand::Register(session));
    }

    pub fn unregister(&self, id: ClientId) {
        self.enqueue(ClientHubCommand::Unregister(id));
    }

    pub fn broadcast(&self, message: Message) {
        self.enqueue(ClientHubCommand::Broadcast(message));
    }

    /// Ids of the registered sessions after every request enqueued so far
    /// has been applied.
    pub async fn session_ids(&self) -> Vec<ClientId> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(ClientHubCommand::Snapshot(reply));
        let mut ids = rx.await.unwrap_or_default();
        ids.sort();
        ids
    }

    pub async fn session_count(&self) -> usize {
        self.session_ids().await.len()
    }

    fn enqueue(&self, command: ClientHubCommand) {
        if let Err(err) = self.commands.send(command) {
            tracing::debug!(command = ?err.0, "Client hub stopped, dropping request");
        }
    }
}

#[derive(Default)]
struct ClientHubTask {
    sessions: HashMap<ClientId, ClientSession>,
}

impl ClientHubTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ClientHubCommand>,
        mut probe: Option<Interval>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
                _ = next_probe(&mut probe) => {
                    tracing::trace!(sessions = self.sessions.len(), "Probing subscribers");
                    self.fan_out(&Message::probe());
                }
            }
        }
        tracing::debug!("Client hub stopped");
    }

    fn apply(&mut self, command: ClientHubCommand) {
        match command {
            ClientHubCommand::Register(session) => {
                tracing::info!(client_id = %session.id, addr = %session.remote_addr, "Subscriber joined");
                let notice = Message::client_joined(&session.remote_addr);
                self.sessions.insert(session.id, session);
                self.fan_out(&notice);
            }
            ClientHubCommand::Unregister(id) => {
                if let Some(session) = self.sessions.remove(&id) {
                    tracing::info!(client_id = %id, addr = %session.remote_addr, "Subscriber left");
                    self.fan_out(&Message::client_left(&session.remote_addr));
                }
            }
            ClientHubCommand::Broadcast(message) => self.fan_out(&message),
            ClientHubCommand::Snapshot(reply) => {
                let _ = reply.send(self.sessions.keys().copied().collect());
            }
        }
    }

    /// Delivers to every session, evicting the ones that fail.
    fn fan_out(&mut self, message: &Message) {
        let evicted = self.deliver_all(message);
        if evicted.is_empty() {
            return;
        }

        let addrs: Vec<&str> = evicted.iter().map(|s| s.remote_addr.as_str()).collect();
        tracing::warn!(evicted = evicted.len(), addrs = ?addrs, "Evicted unreachable subscribers");

        let notice = Message::client_unreachable(&addrs.join(", "));
        let cascaded = self.deliver_all(&notice);
        if !cascaded.is_empty() {
            tracing::warn!(evicted = cascaded.len(), "Evicted subscribers while sending unreachable notice");
        }
    }

    fn deliver_all(&mut self, message: &Message) -> Vec<ClientSession> {
        let failed: Vec<ClientId> = self
            .sessions
            .values()
            .filter(|session| !session.deliver(message))
            .map(|session| session.id)
            .collect();

        failed
            .iter()
            .filter_map(|id| self.sessions.remove(id))
            .collect()
    }
}

async fn next_probe(probe: &mut Option<Interval>) {
    match probe {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::messages::MessageEvent;
    use proptest::prelude::*;

    fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn register_announces_to_every_session() {
        let hub = ClientHub::spawn(None);
        let (a, mut rx_a) = ClientSession::channel("10.0.0.1:1", 16);
        let (b, mut rx_b) = ClientSession::channel("10.0.0.2:2", 16);
        hub.register(a);
        hub.register(b);
        assert_eq!(hub.session_count().await, 2);

        let seen_a = drain(&mut rx_a);
        assert_eq!(seen_a.len(), 2);
        assert_eq!(seen_a[1].data(), "New User Joined...10.0.0.2:2");

        let seen_b = drain(&mut rx_b);
        assert_eq!(seen_b.len(), 1);
    }

    #[tokio::test]
    async fn broadcast_preserves_per_session_order() {
        let hub = ClientHub::spawn(None);
        let (a, mut rx) = ClientSession::channel("a", 16);
        hub.register(a);
        for i in 0..5 {
            hub.broadcast(Message::broker_payload(i.to_string()));
        }
        hub.session_ids().await;

        let payloads: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter(|m| m.event() == MessageEvent::Data)
            .map(|m| m.data().to_string())
            .collect();
        assert_eq!(payloads, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn failed_deliveries_are_evicted_with_one_notice() {
        let hub = ClientHub::spawn(None);
        let mut live = Vec::new();
        let mut dead = Vec::new();
        for i in 0..5 {
            let (session, rx) = ClientSession::channel(format!("10.0.0.{}:9", i), 32);
            hub.register(session);
            if i < 2 {
                dead.push(rx);
            } else {
                live.push(rx);
            }
        }
        assert_eq!(hub.session_count().await, 5);
        for rx in live.iter_mut() {
            drain(rx);
        }
        drop(dead);

        hub.broadcast(Message::broker_payload("update"));
        assert_eq!(hub.session_count().await, 3);

        for rx in live.iter_mut() {
            let seen = drain(rx);
            let errors: Vec<_> = seen
                .iter()
                .filter(|m| m.event() == MessageEvent::Error)
                .collect();
            assert_eq!(seen.len(), 2);
            assert_eq!(errors.len(), 1);
            assert!(errors[0].data().contains("10.0.0.0:9"));
            assert!(errors[0].data().contains("10.0.0.1:9"));
        }
    }

    #[tokio::test]
    async fn full_queue_counts_as_unreachable() {
        let hub = ClientHub::spawn(None);
        let (slow, _rx_slow) = ClientSession::channel("slow", 1);
        hub.register(slow);
        let (fast, mut rx_fast) = ClientSession::channel("fast", 16);
        hub.register(fast);

        // The slow session's single slot already holds its join notice.
        assert_eq!(hub.session_count().await, 1);
        let seen = drain(&mut rx_fast);
        assert!(seen.iter().any(|m| m.data() == "User Unreachable. Disconnected...slow"));
    }

    #[tokio::test]
    async fn unregister_announces_departure_once() {
        let hub = ClientHub::spawn(None);
        let (a, _rx_a) = ClientSession::channel("a", 16);
        let (b, mut rx_b) = ClientSession::channel("b", 16);
        let a_id = a.id();
        hub.register(a);
        hub.register(b);
        hub.unregister(a_id);
        hub.unregister(a_id);
        hub.session_ids().await;

        let left: Vec<_> = drain(&mut rx_b)
            .into_iter()
            .filter(|m| m.data() == "User Disconnected...a")
            .collect();
        assert_eq!(left.len(), 1);
    }

    #[tokio::test]
    async fn probes_evict_closed_sessions() {
        let hub = ClientHub::spawn(Some(Duration::from_millis(20)));
        let (gone, rx_gone) = ClientSession::channel("gone", 16);
        let (kept, mut rx_kept) = ClientSession::channel("kept", 16);
        hub.register(gone);
        hub.register(kept);
        drop(rx_gone);

        time::sleep(Duration::from_millis(80)).await;
        assert_eq!(hub.session_count().await, 1);
        let seen = drain(&mut rx_kept);
        assert!(seen.iter().any(|m| m.event() == MessageEvent::Probe));
        assert_eq!(
            seen.iter().filter(|m| m.event() == MessageEvent::Error).count(),
            1
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Register(usize),
        Unregister(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..6).prop_map(Op::Register),
            (0usize..6).prop_map(Op::Unregister),
        ]
    }

    proptest! {
        #[test]
        fn session_set_follows_submission_order(ops in proptest::collection::vec(op(), 0..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let hub = ClientHub::spawn(None);
                // Receivers are kept alive so no session is evicted.
                let slots: Vec<(ClientSession, mpsc::Receiver<Message>)> =
                    (0..6).map(|i| ClientSession::channel(i.to_string(), 256)).collect();
                let mut expected = std::collections::BTreeSet::new();

                for op in &ops {
                    match op {
                        Op::Register(i) => {
                            hub.register(slots[*i].0.clone());
                            expected.insert(slots[*i].0.id());
                        }
                        Op::Unregister(i) => {
                            hub.unregister(slots[*i].0.id());
                            expected.remove(&slots[*i].0.id());
                        }
                    }
                }

                let actual = hub.session_ids().await;
                let expected: Vec<ClientId> = expected.into_iter().collect();
                assert_eq!(actual, expected);
            });
        }
    }
}
