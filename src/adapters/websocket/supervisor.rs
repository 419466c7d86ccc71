//! BrokerSupervisor - keeps one broker session alive.
//!
//! ## States
//!
//! ```text
//! Connecting ──ok──▶ Active ──read ends──▶ Backoff ──▶ Connecting
//!     │                                      │
//!     └──────────fail───────────▶ Backoff    └── delay above cap ──▶ Abandoned
//! ```
//!
//! On connect the session is registered with the [`BrokerHub`] and every
//! local offer is pushed to the broker. The backoff sequence restarts only
//! after a successful connect.
//!
//! ## Control
//!
//! The hub drives the supervisor through a `watch` channel:
//!
//! - `Paused` parks the supervisor before its next connect attempt. An open
//!   session stays open and the hub discards its payloads.
//! - `Stop` closes the session and ends the task. A stop that lands while
//!   a connect is in flight closes the new link before it is registered.
//!
//! Abandoning is the only path that removes a broker on its own: the broker
//! is unregistered from the hub and deleted from the directory, once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::application::offers::OfferSyncEngine;
use crate::domain::broker::{BackoffPolicy, BrokerRecord};
use crate::ports::{BrokerDirectory, BrokerLink, BrokerTransport};

use super::broker_hub::{BrokerHub, BrokerSession, SupervisorControl};

/// How a supervisor ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// Told to stop, or the hub went away.
    Stopped,
    /// Backoff exceeded its cap; the broker was removed.
    Abandoned,
}

#[derive(Debug, PartialEq, Eq)]
enum LinkEnd {
    Dropped,
    Stopped,
}

pub struct BrokerSupervisor {
    broker: BrokerRecord,
    control: watch::Receiver<SupervisorControl>,
    transport: Arc<dyn BrokerTransport>,
    hub: BrokerHub,
    sync: Arc<OfferSyncEngine>,
    directory: Arc<dyn BrokerDirectory>,
    policy: BackoffPolicy,
}

impl BrokerSupervisor {
    pub fn new(
        broker: BrokerRecord,
        control: watch::Receiver<SupervisorControl>,
        transport: Arc<dyn BrokerTransport>,
        hub: BrokerHub,
        sync: Arc<OfferSyncEngine>,
        directory: Arc<dyn BrokerDirectory>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            broker,
            control,
            transport,
            hub,
            sync,
            directory,
            policy,
        }
    }

    pub fn spawn(self) -> JoinHandle<SupervisorExit> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> SupervisorExit {
        let mut attempt: u32 = 0;
        tracing::info!(broker_id = %self.broker.id, endpoint = %self.broker.endpoint, "Supervisor started");

        loop {
            if !self.wait_until_running().await {
                return self.stopped();
            }

            match self.transport.connect(&self.broker).await {
                Ok(mut link) => {
                    if *self.control.borrow() == SupervisorControl::Stop {
                        tracing::debug!(broker_id = %self.broker.id, "Stopped while connecting");
                        link.close().await;
                        return self.stopped();
                    }
                    attempt = 0;
                    self.on_connected().await;
                    if self.stream(link).await == LinkEnd::Stopped {
                        return self.stopped();
                    }
                    self.hub.disconnected(self.broker.id.clone());
                }
                Err(err) => {
                    tracing::warn!(broker_id = %self.broker.id, attempt = attempt + 1, error = %err, "Broker connect failed");
                }
            }

            attempt += 1;
            let Some(delay) = self.policy.delay_for(attempt) else {
                return self.abandon().await;
            };
            tracing::debug!(broker_id = %self.broker.id, attempt, delay_ms = delay.as_millis() as u64, "Backing off");
            if !self.backoff(delay).await {
                return self.stopped();
            }
        }
    }

    async fn on_connected(&self) {
        tracing::info!(broker_id = %self.broker.id, "Broker connected");
        self.hub.register(BrokerSession {
            id: self.broker.id.clone(),
            name: self.broker.name.clone(),
            endpoint: self.broker.endpoint.clone(),
            enabled: true,
        });
        if let Err(err) = self.sync.selective_sync(&self.broker.id).await {
            tracing::warn!(broker_id = %self.broker.id, error = %err, "Initial offer push incomplete");
        }
    }

    /// Forwards payloads until the link ends or a stop arrives.
    async fn stream(&mut self, mut link: Box<dyn BrokerLink>) -> LinkEnd {
        loop {
            tokio::select! {
                read = link.read_message() => match read {
                    Ok(Some(payload)) => self.hub.forward(self.broker.id.clone(), payload),
                    Ok(None) => {
                        tracing::info!(broker_id = %self.broker.id, "Broker closed the session");
                        return LinkEnd::Dropped;
                    }
                    Err(err) => {
                        tracing::warn!(broker_id = %self.broker.id, error = %err, "Broker session failed");
                        return LinkEnd::Dropped;
                    }
                },
                changed = self.control.changed() => {
                    if changed.is_err() || *self.control.borrow() == SupervisorControl::Stop {
                        link.close().await;
                        return LinkEnd::Stopped;
                    }
                }
            }
        }
    }

    /// Parks while paused. False once stopped.
    async fn wait_until_running(&mut self) -> bool {
        loop {
            let state = *self.control.borrow_and_update();
            match state {
                SupervisorControl::Run => return true,
                SupervisorControl::Stop => return false,
                SupervisorControl::Paused => {
                    tracing::debug!(broker_id = %self.broker.id, "Supervisor paused");
                }
            }
            if self.control.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Sleeps for `delay`. A pause cuts the wait short. False once stopped.
    async fn backoff(&mut self, delay: Duration) -> bool {
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = self.control.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    match *self.control.borrow() {
                        SupervisorControl::Stop => return false,
                        SupervisorControl::Paused => return true,
                        SupervisorControl::Run => {}
                    }
                }
            }
        }
    }

    async fn abandon(&self) -> SupervisorExit {
        tracing::error!(
            broker_id = %self.broker.id,
            endpoint = %self.broker.endpoint,
            "Broker unreachable, removing it"
        );
        self.hub.unregister(self.broker.id.clone());
        match self.directory.delete_broker(&self.broker.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(broker_id = %self.broker.id, "Abandoned broker was already removed")
            }
            Err(err) => {
                tracing::error!(broker_id = %self.broker.id, error = %err, "Failed to remove abandoned broker")
            }
        }
        SupervisorExit::Abandoned
    }

    fn stopped(&self) -> SupervisorExit {
        tracing::info!(broker_id = %self.broker.id, "Supervisor stopped");
        SupervisorExit::Stopped
    }
}
