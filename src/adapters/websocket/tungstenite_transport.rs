//! Outbound broker sessions over tokio-tungstenite.
//!
//! The broker endpoint `http(s)://host[:port][/path]` is dialed as
//! `ws(s)://host[:port][/path]/subscribe`. The broker-issued token travels
//! in the `jwt-token` cookie.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, COOKIE};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::domain::broker::BrokerRecord;
use crate::ports::{BrokerLink, BrokerTransport, TransportError};

#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    connect_timeout: Duration,
}

impl TungsteniteTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

/// Maps a broker endpoint onto its subscription URL.
pub fn subscribe_url(endpoint: &str) -> Result<String, TransportError> {
    let invalid = |reason: &str| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, rest) = endpoint
        .trim()
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme"))?;
    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("unsupported scheme")),
    };
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(invalid("missing host"));
    }

    Ok(format!("{}://{}/subscribe", scheme, rest))
}

#[async_trait]
impl BrokerTransport for TungsteniteTransport {
    async fn connect(&self, broker: &BrokerRecord) -> Result<Box<dyn BrokerLink>, TransportError> {
        let url = subscribe_url(&broker.endpoint)?;
        let connect_error = |reason: String| TransportError::Connect {
            endpoint: url.clone(),
            reason,
        };

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| connect_error(e.to_string()))?;
        let cookie = HeaderValue::from_str(&format!("jwt-token={}", broker.token()))
            .map_err(|e| connect_error(e.to_string()))?;
        request.headers_mut().insert(COOKIE, cookie);

        let (stream, _) = time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| connect_error("timed out".to_string()))?
            .map_err(|e| connect_error(e.to_string()))?;

        tracing::debug!(broker_id = %broker.id, url = %url, "Broker socket open");
        Ok(Box::new(TungsteniteLink { stream }))
    }
}

struct TungsteniteLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl BrokerLink for TungsteniteLink {
    async fn read_message(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Read(e.to_string())),
            }
        }
    }

    async fn write_message(&mut self, payload: &str) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(payload.to_string()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "Broker socket close failed");
        }
    }
}
