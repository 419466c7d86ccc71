//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `http` - broker and seller HTTP clients, plus in-memory stand-ins
//! - `identity` - the local cluster's identity
//! - `storage` - in-memory catalog store and broker directory
//! - `websocket` - client and broker hubs, supervisors, transports

pub mod http;
pub mod identity;
pub mod storage;
pub mod websocket;
