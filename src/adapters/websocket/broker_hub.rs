//! Hub of broker sessions.
//!
//! Same single-owner pattern as [`ClientHub`]: one task owns the set of
//! connected broker sessions and the control handles of their supervisors,
//! and every change arrives through its FIFO queue. Topology changes are
//! announced to local subscribers through the client hub.
//!
//! Sessions and supervisors refer to each other by [`BrokerId`] only.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot, watch};

use crate::domain::foundation::BrokerId;

use super::client_hub::ClientHub;
use super::messages::Message;

/// What a supervisor is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorControl {
    /// Connect, reconnect and stream.
    Run,
    /// Keep an open session but do not reconnect or treat data as active.
    Paused,
    /// Close the session and terminate.
    Stop,
}

/// A connected broker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSession {
    pub id: BrokerId,
    pub name: String,
    pub endpoint: String,
    pub enabled: bool,
}

/// Result of asking the hub to track a supervisor for a broker.
#[derive(Debug)]
pub enum Attachment {
    /// No supervisor existed. The caller must start one with this handle.
    Fresh(watch::Receiver<SupervisorControl>),
    /// A supervisor already exists and has been told to run.
    ///
    /// `resync` is set when a paused broker with an open session was
    /// resumed: its catalog missed every change made while paused.
    Resumed { resync: bool },
}

enum BrokerHubCommand {
    Attach(BrokerId, oneshot::Sender<Attachment>),
    Register(BrokerSession),
    Disconnected(BrokerId),
    Forward(BrokerId, String),
    Unsubscribe(BrokerId),
    Unregister(BrokerId),
    Snapshot(oneshot::Sender<HubSnapshot>),
}

/// Point-in-time view of the hub, for monitoring and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSnapshot {
    pub sessions: Vec<BrokerSession>,
    pub supervised: Vec<BrokerId>,
}

/// Handle to the broker hub task.
#[derive(Clone)]
pub struct BrokerHub {
    commands: mpsc::UnboundedSender<BrokerHubCommand>,
}

impl BrokerHub {
    /// Spawns the hub task. Notices go to `clients`.
    pub fn spawn(clients: ClientHub) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = BrokerHubTask {
            clients,
            sessions: HashMap::new(),
            supervisors: HashMap::new(),
        };
        tokio::spawn(task.run(rx));
        Self { commands }
    }

    /// Tracks a supervisor for `id`, or resumes the existing one.
    ///
    /// Returns `None` if the hub has stopped.
    pub async fn attach(&self, id: BrokerId) -> Option<Attachment> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(BrokerHubCommand::Attach(id, reply));
        rx.await.ok()
    }

    /// Records a connected session and announces it.
    pub fn register(&self, session: BrokerSession) {
        self.enqueue(BrokerHubCommand::Register(session));
    }

    /// Drops a session whose transport ended. The supervisor keeps running.
    pub fn disconnected(&self, id: BrokerId) {
        self.enqueue(BrokerHubCommand::Disconnected(id));
    }

    /// Hands a payload received from a broker to the local subscribers.
    ///
    /// Payloads from paused or unknown sessions are dropped.
    pub fn forward(&self, id: BrokerId, payload: String) {
        self.enqueue(BrokerHubCommand::Forward(id, payload));
    }

    /// Pauses a broker without closing its session.
    pub fn unsubscribe(&self, id: BrokerId) {
        self.enqueue(BrokerHubCommand::Unsubscribe(id));
    }

    /// Removes a broker and stops its supervisor.
    pub fn unregister(&self, id: BrokerId) {
        self.enqueue(BrokerHubCommand::Unregister(id));
    }

    /// State after every request enqueued so far has been applied.
    pub async fn snapshot(&self) -> HubSnapshot {
        let (reply, rx) = oneshot::channel();
        self.enqueue(BrokerHubCommand::Snapshot(reply));
        rx.await.unwrap_or_default()
    }

    fn enqueue(&self, command: BrokerHubCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Broker hub stopped, dropping request");
        }
    }
}

struct BrokerHubTask {
    clients: ClientHub,
    sessions: HashMap<BrokerId, BrokerSession>,
    supervisors: HashMap<BrokerId, watch::Sender<SupervisorControl>>,
}

impl BrokerHubTask {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<BrokerHubCommand>) {
        while let Some(command) = commands.recv().await {
            self.apply(command);
        }
        for control in self.supervisors.values() {
            let _ = control.send(SupervisorControl::Stop);
        }
        tracing::debug!("Broker hub stopped");
    }

    fn apply(&mut self, command: BrokerHubCommand) {
        match command {
            BrokerHubCommand::Attach(id, reply) => {
                let attachment = self.attach(&id);
                if reply.send(attachment).is_err() {
                    tracing::debug!(broker_id = %id, "Attach requester went away");
                }
            }
            BrokerHubCommand::Register(mut session) => {
                let Some(control) = self.supervisors.get(&session.id) else {
                    tracing::debug!(broker_id = %session.id, "Dropping session of unsupervised broker");
                    return;
                };
                session.enabled &= *control.borrow() == SupervisorControl::Run;
                tracing::info!(broker_id = %session.id, endpoint = %session.endpoint, "Broker session registered");
                self.clients.broadcast(Message::broker_joined(&session.endpoint));
                self.sessions.insert(session.id.clone(), session);
            }
            BrokerHubCommand::Disconnected(id) => {
                if self.sessions.remove(&id).is_some() {
                    tracing::info!(broker_id = %id, "Broker session dropped");
                    self.clients.broadcast(Message::broker_disconnected(id.as_str()));
                }
            }
            BrokerHubCommand::Forward(id, payload) => match self.sessions.get(&id) {
                Some(session) if session.enabled => {
                    self.clients.broadcast(Message::broker_payload(payload));
                }
                Some(_) => tracing::trace!(broker_id = %id, "Dropping payload from paused broker"),
                None => tracing::trace!(broker_id = %id, "Dropping payload from unknown broker"),
            },
            BrokerHubCommand::Unsubscribe(id) => {
                let Some(control) = self.supervisors.get(&id) else {
                    tracing::debug!(broker_id = %id, "Unsubscribe for unsupervised broker");
                    return;
                };
                let _ = control.send(SupervisorControl::Paused);
                if let Some(session) = self.sessions.get_mut(&id) {
                    session.enabled = false;
                }
                tracing::info!(broker_id = %id, "Broker unsubscribed");
                self.clients.broadcast(Message::broker_unsubscribed(id.as_str()));
            }
            BrokerHubCommand::Unregister(id) => {
                let control = self.supervisors.remove(&id);
                let session = self.sessions.remove(&id);
                if let Some(control) = &control {
                    let _ = control.send(SupervisorControl::Stop);
                }
                if control.is_some() || session.is_some() {
                    tracing::info!(broker_id = %id, "Broker unregistered");
                    self.clients.broadcast(Message::broker_disconnected(id.as_str()));
                }
            }
            BrokerHubCommand::Snapshot(reply) => {
                let mut sessions: Vec<BrokerSession> = self.sessions.values().cloned().collect();
                sessions.sort_by(|a, b| a.id.cmp(&b.id));
                let mut supervised: Vec<BrokerId> = self.supervisors.keys().cloned().collect();
                supervised.sort();
                let _ = reply.send(HubSnapshot {
                    sessions,
                    supervised,
                });
            }
        }
    }

    fn attach(&mut self, id: &BrokerId) -> Attachment {
        if let Some(control) = self.supervisors.get(id) {
            let resumed = *control.borrow() == SupervisorControl::Paused;
            let _ = control.send(SupervisorControl::Run);
            let connected = match self.sessions.get_mut(id) {
                Some(session) => {
                    session.enabled = true;
                    true
                }
                None => false,
            };
            if resumed {
                tracing::info!(broker_id = %id, "Broker subscribed");
                self.clients.broadcast(Message::broker_subscribed(id.as_str()));
            }
            return Attachment::Resumed {
                resync: resumed && connected,
            };
        }

        let (control, rx) = watch::channel(SupervisorControl::Run);
        self.supervisors.insert(id.clone(), control);
        Attachment::Fresh(rx)
    }
}
