//! WebSocket upgrade handler for local subscribers.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Register a session with the client hub
//! 3. Forward the session's outbound queue as JSON text frames
//! 4. Unregister when the client closes or the socket fails
//!
//! Subscribers only listen. Inbound frames other than close are ignored.

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use super::client_hub::{ClientHub, ClientSession};
use super::messages::Message;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct SubscriberState {
    pub clients: ClientHub,
    /// Outbound queue capacity per session.
    pub buffer: usize,
}

impl SubscriberState {
    pub fn new(clients: ClientHub, buffer: usize) -> Self {
        Self { clients, buffer }
    }
}

/// Route: `GET /api/subscribe`
pub async fn subscribe_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SubscriberState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: SubscriberState) {
    let (mut sender, mut receiver) = socket.split();
    let (session, mut outbound) = ClientSession::channel(addr.to_string(), state.buffer);
    let client_id = session.id();
    state.clients.register(session);
    tracing::debug!(client_id = %client_id, remote_addr = %addr, "Subscriber connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let Some(frame) = encode(&message) else {
                continue;
            };
            if let Err(e) = sender.send(frame).await {
                tracing::debug!(client_id = %client_id, error = %e, "Send error, closing connection");
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(WsMessage::Close(_)) => {
                    tracing::debug!(client_id = %client_id, "Client sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(client_id = %client_id, error = %e, "Receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.clients.unregister(client_id);
}

fn encode(message: &Message) -> Option<WsMessage> {
    match serde_json::to_string(message) {
        Ok(json) => Some(WsMessage::Text(json)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode subscriber message");
            None
        }
    }
}

/// Create axum router for the subscriber endpoint.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", subscriber_router(state));
/// ```
pub fn subscriber_router(state: SubscriberState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/subscribe", get(subscribe_handler))
        .with_state(state)
}
