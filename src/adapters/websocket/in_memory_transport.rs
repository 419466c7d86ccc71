//! Scriptable broker transport for tests and local runs.
//!
//! Connect attempts can be made to fail or to hang for a while, frames can
//! be pushed into an open link, and links can be dropped or broken from the
//! outside.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{self, Instant};

use crate::domain::broker::BrokerRecord;
use crate::domain::foundation::BrokerId;
use crate::ports::{BrokerLink, BrokerTransport, TransportError};

#[derive(Debug)]
enum LinkEvent {
    Payload(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct ScriptedBroker {
    fail_next: u32,
    always_fail: bool,
    attempts: u32,
    connect_delay: Option<Duration>,
    link: Option<mpsc::UnboundedSender<LinkEvent>>,
    written: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBrokerTransport {
    brokers: Arc<Mutex<HashMap<BrokerId, ScriptedBroker>>>,
}

impl InMemoryBrokerTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` connect attempts to the broker fail.
    pub async fn fail_next(&self, id: &BrokerId, count: u32) {
        self.brokers.lock().await.entry(id.clone()).or_default().fail_next = count;
    }

    /// Every connect attempt to the broker fails until `recover`.
    pub async fn always_fail(&self, id: &BrokerId) {
        self.brokers.lock().await.entry(id.clone()).or_default().always_fail = true;
    }

    /// Every connect attempt to the broker takes `delay` before it resolves.
    pub async fn delay_connect(&self, id: &BrokerId, delay: Duration) {
        self.brokers.lock().await.entry(id.clone()).or_default().connect_delay = Some(delay);
    }

    pub async fn recover(&self, id: &BrokerId) {
        let mut brokers = self.brokers.lock().await;
        let broker = brokers.entry(id.clone()).or_default();
        broker.always_fail = false;
        broker.fail_next = 0;
    }

    /// Delivers a frame on the broker's open link. False when no link is open.
    pub async fn push(&self, id: &BrokerId, payload: impl Into<String>) -> bool {
        self.send(id, LinkEvent::Payload(payload.into())).await
    }

    /// Makes the open link report a read error.
    pub async fn break_link(&self, id: &BrokerId, reason: impl Into<String>) -> bool {
        self.send(id, LinkEvent::Fail(reason.into())).await
    }

    /// Ends the open link as if the broker closed it.
    pub async fn drop_link(&self, id: &BrokerId) -> bool {
        let mut brokers = self.brokers.lock().await;
        brokers
            .get_mut(id)
            .and_then(|b| b.link.take())
            .is_some()
    }

    pub async fn connect_attempts(&self, id: &BrokerId) -> u32 {
        self.brokers.lock().await.get(id).map_or(0, |b| b.attempts)
    }

    pub async fn is_connected(&self, id: &BrokerId) -> bool {
        self.brokers
            .lock()
            .await
            .get(id)
            .and_then(|b| b.link.as_ref())
            .map_or(false, |tx| !tx.is_closed())
    }

    /// Frames the connector wrote to the broker.
    pub async fn written(&self, id: &BrokerId) -> Vec<String> {
        self.brokers
            .lock()
            .await
            .get(id)
            .map(|b| b.written.clone())
            .unwrap_or_default()
    }

    /// Polls until the broker has an open link or `within` elapses.
    pub async fn wait_connected(&self, id: &BrokerId, within: Duration) -> bool {
        let deadline = Instant::now() + within;
        loop {
            if self.is_connected(id).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn send(&self, id: &BrokerId, event: LinkEvent) -> bool {
        let brokers = self.brokers.lock().await;
        brokers
            .get(id)
            .and_then(|b| b.link.as_ref())
            .map_or(false, |tx| tx.send(event).is_ok())
    }
}

#[async_trait]
impl BrokerTransport for InMemoryBrokerTransport {
    async fn connect(&self, broker: &BrokerRecord) -> Result<Box<dyn BrokerLink>, TransportError> {
        let delay = {
            let mut brokers = self.brokers.lock().await;
            let scripted = brokers.entry(broker.id.clone()).or_default();
            scripted.attempts += 1;
            scripted.connect_delay
        };
        if let Some(delay) = delay {
            time::sleep(delay).await;
        }

        let mut brokers = self.brokers.lock().await;
        let scripted = brokers.entry(broker.id.clone()).or_default();

        if scripted.always_fail || scripted.fail_next > 0 {
            scripted.fail_next = scripted.fail_next.saturating_sub(1);
            return Err(TransportError::Connect {
                endpoint: broker.endpoint.clone(),
                reason: "connection refused".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        scripted.link = Some(tx);
        Ok(Box::new(InMemoryLink {
            id: broker.id.clone(),
            inbound: rx,
            brokers: Arc::clone(&self.brokers),
        }))
    }
}

struct InMemoryLink {
    id: BrokerId,
    inbound: mpsc::UnboundedReceiver<LinkEvent>,
    brokers: Arc<Mutex<HashMap<BrokerId, ScriptedBroker>>>,
}

#[async_trait]
impl BrokerLink for InMemoryLink {
    async fn read_message(&mut self) -> Result<Option<String>, TransportError> {
        match self.inbound.recv().await {
            Some(LinkEvent::Payload(payload)) => Ok(Some(payload)),
            Some(LinkEvent::Fail(reason)) => Err(TransportError::Read(reason)),
            None => Ok(None),
        }
    }

    async fn write_message(&mut self, payload: &str) -> Result<(), TransportError> {
        let mut brokers = self.brokers.lock().await;
        match brokers.get_mut(&self.id) {
            Some(broker) if broker.link.is_some() => {
                broker.written.push(payload.to_string());
                Ok(())
            }
            _ => Err(TransportError::Write("link closed".to_string())),
        }
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker(id: &str) -> BrokerRecord {
        BrokerRecord::new(BrokerId::new(id).unwrap(), id, "http://b", "t")
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed() {
        let transport = InMemoryBrokerTransport::new();
        let b = broker("b");
        transport.fail_next(&b.id, 2).await;

        assert!(transport.connect(&b).await.is_err());
        assert!(transport.connect(&b).await.is_err());
        assert!(transport.connect(&b).await.is_ok());
        assert_eq!(transport.connect_attempts(&b.id).await, 3);
    }

    #[tokio::test]
    async fn delayed_connect_counts_the_attempt_up_front() {
        let transport = InMemoryBrokerTransport::new();
        let b = broker("b");
        transport.delay_connect(&b.id, Duration::from_millis(50)).await;

        let pending = tokio::spawn({
            let transport = transport.clone();
            let b = b.clone();
            async move { transport.connect(&b).await.is_ok() }
        });
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(transport.connect_attempts(&b.id).await, 1);
        assert!(!transport.is_connected(&b.id).await);
        assert!(pending.await.unwrap());
        assert!(transport.is_connected(&b.id).await);
    }

    #[tokio::test]
    async fn pushed_frames_are_read_in_order() {
        let transport = InMemoryBrokerTransport::new();
        let b = broker("b");
        let mut link = transport.connect(&b).await.unwrap();

        assert!(transport.push(&b.id, "one").await);
        assert!(transport.push(&b.id, "two").await);

        assert_eq!(link.read_message().await.unwrap().as_deref(), Some("one"));
        assert_eq!(link.read_message().await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn dropped_link_reads_end_of_stream() {
        let transport = InMemoryBrokerTransport::new();
        let b = broker("b");
        let mut link = transport.connect(&b).await.unwrap();

        assert!(transport.drop_link(&b.id).await);

        assert_eq!(link.read_message().await.unwrap(), None);
        assert!(!transport.is_connected(&b.id).await);
        assert!(!transport.push(&b.id, "late").await);
    }

    #[tokio::test]
    async fn broken_link_reads_an_error() {
        let transport = InMemoryBrokerTransport::new();
        let b = broker("b");
        let mut link = transport.connect(&b).await.unwrap();

        transport.break_link(&b.id, "reset").await;

        assert_eq!(
            link.read_message().await.unwrap_err(),
            TransportError::Read("reset".to_string())
        );
    }

    #[tokio::test]
    async fn closing_the_link_disconnects() {
        let transport = InMemoryBrokerTransport::new();
        let b = broker("b");
        let mut link = transport.connect(&b).await.unwrap();
        link.write_message("hello").await.unwrap();

        link.close().await;

        assert!(!transport.is_connected(&b.id).await);
        assert_eq!(transport.written(&b.id).await, vec!["hello"]);
    }
}
