//! Remote broker API port.
//!
//! Every call is authenticated with the broker's stored bearer token.
//! Non-success responses surface as [`RemoteError::UnexpectedStatus`] with
//! the status code and the body, parsed as JSON when possible.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::broker::{AuthenticationRequest, AuthenticationResponse, BrokerRecord};
use crate::domain::catalog::{Catalog, Offer};

/// Failure talking to a broker or a seller over HTTP.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("request to {endpoint} timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },

    #[error("{endpoint} answered {status}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: serde_json::Value,
    },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("{endpoint} rejected the request: {reason}")]
    Rejected { endpoint: String, reason: String },
}

impl RemoteError {
    pub fn transport(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        RemoteError::Transport {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Builds an `UnexpectedStatus` error, keeping the raw body when it is
    /// not JSON.
    pub fn unexpected_status(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        let body = serde_json::from_str(body)
            .unwrap_or_else(|_| serde_json::Value::String(body.to_string()));
        RemoteError::UnexpectedStatus {
            endpoint: endpoint.into(),
            status,
            body,
        }
    }

    /// HTTP status, when the peer answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Offer operations against one broker.
#[async_trait]
pub trait RemoteBrokerApi: Send + Sync {
    /// Catalogs the broker currently lists.
    async fn get_catalog(&self) -> Result<Vec<Catalog>, RemoteError>;

    /// Creates or updates one offer keyed by its id.
    async fn post_offer(&self, offer: &Offer) -> Result<(), RemoteError>;

    /// Creates or updates several offers. An empty slice sends nothing.
    async fn bulk_post_offers(&self, offers: &[Offer]) -> Result<(), RemoteError>;

    /// Deletes one offer by id.
    async fn delete_offer(&self, offer_id: &str) -> Result<(), RemoteError>;

    /// Deletes every offer the broker holds for this cluster.
    async fn delete_all_offers(&self) -> Result<(), RemoteError>;
}

/// Entry point to the brokers: registration and per-broker clients.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Performs the registration handshake with a broker endpoint.
    async fn authenticate(
        &self,
        endpoint: &str,
        request: &AuthenticationRequest,
    ) -> Result<AuthenticationResponse, RemoteError>;

    /// API client bound to a broker's endpoint and token.
    fn client_for(&self, broker: &BrokerRecord) -> Arc<dyn RemoteBrokerApi>;
}
