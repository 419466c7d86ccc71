//! Remote broker API over HTTP.
//!
//! | Call | Route |
//! |------|-------|
//! | `authenticate` | `POST {endpoint}/authenticate` |
//! | `get_catalog` | `GET {endpoint}/catalog` |
//! | `post_offer` | `POST {endpoint}/offer/{offerID}` |
//! | `bulk_post_offers` | `POST {endpoint}/offers` |
//! | `delete_offer` | `DELETE {endpoint}/offer/{offerID}` |
//! | `delete_all_offers` | `DELETE {endpoint}/cluster` |
//!
//! Every call except `authenticate` carries the broker-issued token as a
//! bearer credential.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::broker::{AuthenticationRequest, AuthenticationResponse, BrokerRecord};
use crate::domain::catalog::{Catalog, Offer};
use crate::ports::{BrokerGateway, RemoteBrokerApi, RemoteError};

/// Creates per-broker HTTP clients sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpBrokerGateway {
    client: Client,
    timeout: Duration,
}

impl HttpBrokerGateway {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl BrokerGateway for HttpBrokerGateway {
    async fn authenticate(
        &self,
        endpoint: &str,
        request: &AuthenticationRequest,
    ) -> Result<AuthenticationResponse, RemoteError> {
        let base = base_url(endpoint);
        let response = send(
            self.client
                .post(format!("{}/authenticate", base))
                .json(request),
            base,
            self.timeout,
        )
        .await?;

        response
            .json::<AuthenticationResponse>()
            .await
            .map_err(|e| RemoteError::InvalidResponse {
                endpoint: base.to_string(),
                reason: e.to_string(),
            })
    }

    fn client_for(&self, broker: &BrokerRecord) -> Arc<dyn RemoteBrokerApi> {
        Arc::new(HttpBrokerClient {
            client: self.client.clone(),
            base_url: base_url(&broker.endpoint).to_string(),
            token: Secret::new(broker.token().to_string()),
            timeout: self.timeout,
        })
    }
}

/// Client bound to one broker and its token.
pub struct HttpBrokerClient {
    client: Client,
    base_url: String,
    token: Secret<String>,
    timeout: Duration,
}

impl HttpBrokerClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        send(
            request.bearer_auth(self.token.expose_secret()),
            &self.base_url,
            self.timeout,
        )
        .await
    }
}

#[async_trait]
impl RemoteBrokerApi for HttpBrokerClient {
    async fn get_catalog(&self) -> Result<Vec<Catalog>, RemoteError> {
        let response = self.send(self.client.get(self.url("/catalog"))).await?;
        response
            .json::<Vec<Catalog>>()
            .await
            .map_err(|e| RemoteError::InvalidResponse {
                endpoint: self.base_url.clone(),
                reason: e.to_string(),
            })
    }

    async fn post_offer(&self, offer: &Offer) -> Result<(), RemoteError> {
        let url = self.url(&format!("/offer/{}", offer.offer_id));
        self.send(self.client.post(url).json(offer)).await?;
        tracing::debug!(endpoint = %self.base_url, offer_id = %offer.offer_id, "Offer posted");
        Ok(())
    }

    async fn bulk_post_offers(&self, offers: &[Offer]) -> Result<(), RemoteError> {
        if offers.is_empty() {
            return Ok(());
        }
        self.send(self.client.post(self.url("/offers")).json(offers))
            .await?;
        tracing::debug!(endpoint = %self.base_url, offers = offers.len(), "Offers posted");
        Ok(())
    }

    async fn delete_offer(&self, offer_id: &str) -> Result<(), RemoteError> {
        let url = self.url(&format!("/offer/{}", offer_id));
        self.send(self.client.delete(url)).await?;
        tracing::debug!(endpoint = %self.base_url, offer_id, "Offer deleted");
        Ok(())
    }

    async fn delete_all_offers(&self) -> Result<(), RemoteError> {
        self.send(self.client.delete(self.url("/cluster"))).await?;
        tracing::debug!(endpoint = %self.base_url, "All offers deleted");
        Ok(())
    }
}

/// Endpoint without trailing slashes.
pub(crate) fn base_url(endpoint: &str) -> &str {
    endpoint.trim_end_matches('/')
}

/// Sends a request, mapping transport failures and non-2xx answers.
pub(crate) async fn send(
    request: RequestBuilder,
    endpoint: &str,
    timeout: Duration,
) -> Result<Response, RemoteError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            RemoteError::Timeout {
                endpoint: endpoint.to_string(),
                secs: timeout.as_secs(),
            }
        } else {
            RemoteError::transport(endpoint, e)
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(endpoint, status = status.as_u16(), "Remote call rejected");
    Err(RemoteError::unexpected_status(endpoint, status.as_u16(), &body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::BrokerId;

    #[test]
    fn base_url_drops_trailing_slashes() {
        assert_eq!(base_url("http://broker:8080/"), "http://broker:8080");
        assert_eq!(base_url("http://broker:8080"), "http://broker:8080");
    }

    #[test]
    fn client_routes_are_built_from_the_broker_endpoint() {
        let gateway = HttpBrokerGateway::new(Duration::from_secs(1)).unwrap();
        let broker = BrokerRecord::new(
            BrokerId::new("b").unwrap(),
            "b",
            "https://broker.example/",
            "t",
        );
        let client = HttpBrokerClient {
            client: gateway.client.clone(),
            base_url: base_url(&broker.endpoint).to_string(),
            token: Secret::new(broker.token().to_string()),
            timeout: gateway.timeout,
        };

        assert_eq!(client.url("/offer/o-1"), "https://broker.example/offer/o-1");
    }

    #[tokio::test]
    async fn unreachable_broker_is_a_transport_error() {
        let gateway = HttpBrokerGateway::new(Duration::from_secs(2)).unwrap();
        let broker = BrokerRecord::new(
            BrokerId::new("b").unwrap(),
            "b",
            "http://127.0.0.1:9",
            "t",
        );

        let err = gateway.client_for(&broker).delete_all_offers().await.unwrap_err();

        assert!(matches!(
            err,
            RemoteError::Transport { .. } | RemoteError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn empty_bulk_post_sends_nothing() {
        let gateway = HttpBrokerGateway::new(Duration::from_secs(1)).unwrap();
        let broker = BrokerRecord::new(
            BrokerId::new("b").unwrap(),
            "b",
            "http://127.0.0.1:9",
            "t",
        );

        assert!(gateway.client_for(&broker).bulk_post_offers(&[]).await.is_ok());
    }
}
