//! WebSocket message envelope shared by subscriber and broker sessions.
//!
//! Wire format:
//!
//! ```json
//! {"type": 1, "body": {"event": 2, "data": "..."}}
//! ```
//!
//! `type` carries the origin of the message (subscriber traffic or broker
//! topology), `event` what happened.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Kind of subscriber-facing traffic and text payloads.
pub const CLIENT_KIND: u16 = 1;

/// Kind of broker topology notices.
pub const BROKER_KIND: u16 = 20;

/// Payload of liveness probes sent to subscribers.
pub const PROBE_PAYLOAD: &str = "isAlive";

/// What a message reports. Encoded as an integer code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageEvent {
    /// Topology or lifecycle notice.
    Lifecycle,
    /// Opaque payload forwarded from a broker.
    Data,
    /// Error or unreachable notice.
    Error,
    /// Liveness probe.
    Probe,
}

impl MessageEvent {
    pub fn code(self) -> u8 {
        match self {
            MessageEvent::Lifecycle => 1,
            MessageEvent::Data => 2,
            MessageEvent::Error => 3,
            MessageEvent::Probe => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(MessageEvent::Lifecycle),
            2 => Some(MessageEvent::Data),
            3 => Some(MessageEvent::Error),
            4 => Some(MessageEvent::Probe),
            _ => None,
        }
    }
}

impl Serialize for MessageEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for MessageEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        MessageEvent::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown event code {}", code)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub event: MessageEvent,
    pub data: String,
}

/// Immutable envelope exchanged over every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: u16,
    pub body: MessageBody,
}

impl Message {
    pub fn new(kind: u16, event: MessageEvent, data: impl Into<String>) -> Self {
        Self {
            kind,
            body: MessageBody {
                event,
                data: data.into(),
            },
        }
    }

    pub fn event(&self) -> MessageEvent {
        self.body.event
    }

    pub fn data(&self) -> &str {
        &self.body.data
    }

    /// A payload received on a broker session.
    pub fn broker_payload(payload: impl Into<String>) -> Self {
        Self::new(CLIENT_KIND, MessageEvent::Data, payload)
    }

    pub fn client_joined(addr: &str) -> Self {
        Self::new(CLIENT_KIND, MessageEvent::Lifecycle, format!("New User Joined...{}", addr))
    }

    pub fn client_left(addr: &str) -> Self {
        Self::new(CLIENT_KIND, MessageEvent::Lifecycle, format!("User Disconnected...{}", addr))
    }

    pub fn client_unreachable(addr: &str) -> Self {
        Self::new(
            CLIENT_KIND,
            MessageEvent::Error,
            format!("User Unreachable. Disconnected...{}", addr),
        )
    }

    pub fn probe() -> Self {
        Self::new(CLIENT_KIND, MessageEvent::Probe, PROBE_PAYLOAD)
    }

    pub fn broker_joined(endpoint: &str) -> Self {
        Self::new(BROKER_KIND, MessageEvent::Lifecycle, format!("New Broker Joined...{}", endpoint))
    }

    pub fn broker_disconnected(broker_id: &str) -> Self {
        Self::new(BROKER_KIND, MessageEvent::Lifecycle, format!("Broker Disconnected...{}", broker_id))
    }

    pub fn broker_unsubscribed(broker_id: &str) -> Self {
        Self::new(BROKER_KIND, MessageEvent::Lifecycle, format!("Broker Unsubscribed...{}", broker_id))
    }

    pub fn broker_subscribed(broker_id: &str) -> Self {
        Self::new(BROKER_KIND, MessageEvent::Lifecycle, format!("Broker Subscribed...{}", broker_id))
    }
}
