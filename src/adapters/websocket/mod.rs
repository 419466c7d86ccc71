//! WebSocket adapters: local subscribers, broker sessions and the hubs
//! between them.
//!
//! # Architecture
//!
//! ```text
//!  broker A ──tungstenite──▶ BrokerSupervisor ─┐
//!  broker B ──tungstenite──▶ BrokerSupervisor ─┼─▶ BrokerHub ──notices/payloads──▶ ClientHub
//!                                              │                                    │
//!                       OfferSyncEngine ◀──────┘                                    ▼
//!                       (push on connect)                               GET /api/subscribe
//!                                                                       (local dashboards)
//! ```
//!
//! # Components
//!
//! - [`messages`] - wire envelope shared by every session
//! - [`client_hub`] - single-owner set of subscriber sessions
//! - [`broker_hub`] - single-owner set of broker sessions and supervisor controls
//! - [`supervisor`] - per-broker connect/stream/backoff loop
//! - [`subscriptions`] - starts and controls supervisors
//! - [`handler`] - axum WebSocket upgrade handler for subscribers
//! - [`tungstenite_transport`] / [`in_memory_transport`] - broker transports

pub mod broker_hub;
pub mod client_hub;
pub mod handler;
pub mod in_memory_transport;
pub mod messages;
pub mod subscriptions;
pub mod supervisor;
pub mod tungstenite_transport;

pub use broker_hub::{Attachment, BrokerHub, BrokerSession, HubSnapshot, SupervisorControl};
pub use client_hub::{ClientHub, ClientId, ClientSession};
pub use handler::{subscriber_router, SubscriberState};
pub use in_memory_transport::InMemoryBrokerTransport;
pub use messages::{Message, MessageBody, MessageEvent, BROKER_KIND, CLIENT_KIND, PROBE_PAYLOAD};
pub use subscriptions::BrokerSubscriptions;
pub use supervisor::{BrokerSupervisor, SupervisorExit};
pub use tungstenite_transport::TungsteniteTransport;
