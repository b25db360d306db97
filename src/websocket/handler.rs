//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.
//! Each socket is both a producer and a subscriber: readings it sends are
//! ingested, and every broadcast reading is written back to it.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::hub::{ConnectionId, TelemetryHub};

/// Pending replies (pong, error) per connection
const CONTROL_BUFFER: usize = 32;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    let send_timeout = state.config.send_timeout();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, send_timeout))
}

/// Why a frame could not be written to the socket
#[derive(Debug, Error)]
enum SendError {
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("socket write failed: {0}")]
    Socket(#[from] axum::Error),

    #[error("socket write timed out after {0:?}")]
    Timeout(Duration),
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<TelemetryHub>, send_timeout: Duration) {
    let (mut sender, mut receiver) = socket.split();

    // Register with hub
    let mut subscription = hub.connect();
    let connection_id = subscription.id();

    let connected_msg = ServerMessage::Connected {
        connection_id: connection_id.to_string(),
    };
    if let Err(e) = send_message(&mut sender, &connected_msg, send_timeout).await {
        tracing::error!(
            connection_id = %connection_id,
            error = %e,
            "Failed to send connected message"
        );
        hub.disconnect(&connection_id);
        return;
    }

    // Replies addressed to this connection only (pong, errors)
    let (control_tx, mut control_rx) = mpsc::channel::<ServerMessage>(CONTROL_BUFFER);

    // Task to forward broadcasts and replies to the WebSocket. Owns the
    // subscription, so ending the task disconnects it.
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                control = control_rx.recv() => match control {
                    Some(msg) => msg,
                    None => break,
                },
                reading = subscription.recv() => match reading {
                    Some(data) => ServerMessage::SensorUpdate { data },
                    None => {
                        tracing::debug!(
                            connection_id = %connection_id,
                            "Disconnected by hub, closing connection"
                        );
                        break;
                    }
                },
            };

            match send_message(&mut sender, &msg, send_timeout).await {
                Ok(()) => {}
                Err(SendError::Serialize(e)) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "WebSocket send failed, closing connection"
                    );
                    break;
                }
            }
        }
        let _ = sender.close().await;
    });

    let hub_for_recv = Arc::clone(&hub);

    // Task to receive messages from WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, &connection_id, &control_tx, msg) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // Cleanup: the aborted send task drops the subscription, this makes
    // the removal immediate
    hub.disconnect(&connection_id);
}

/// Serialize and write one message, bounded by `send_timeout`
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    send_timeout: Duration,
) -> Result<(), SendError> {
    let text = serde_json::to_string(message)?;
    tokio::time::timeout(send_timeout, sender.send(Message::Text(text)))
        .await
        .map_err(|_| SendError::Timeout(send_timeout))??;
    Ok(())
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
fn handle_ws_message(
    hub: &TelemetryHub,
    connection_id: &ConnectionId,
    replies: &mpsc::Sender<ServerMessage>,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(hub, connection_id, replies, client_msg);
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    // Send error but keep connection open
                    reply(
                        connection_id,
                        replies,
                        ServerMessage::error(format!("Invalid message format: {}", e)),
                    );
                }
            }
            true
        }
        Message::Binary(_) => {
            reply(
                connection_id,
                replies,
                ServerMessage::error("Binary messages not supported"),
            );
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Axum answers pings automatically
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
fn handle_client_message(
    hub: &TelemetryHub,
    connection_id: &ConnectionId,
    replies: &mpsc::Sender<ServerMessage>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::SensorData { data } => {
            hub.ingest_via_channel(connection_id, data);
        }
        ClientMessage::Ping => {
            reply(connection_id, replies, ServerMessage::Pong);
        }
    }
}

/// Queue a reply without waiting. A client that floods the socket faster
/// than its replies drain loses the surplus replies.
fn reply(
    connection_id: &ConnectionId,
    replies: &mpsc::Sender<ServerMessage>,
    msg: ServerMessage,
) {
    if let Err(mpsc::error::TrySendError::Full(_)) = replies.try_send(msg) {
        tracing::debug!(connection_id = %connection_id, "Reply queue full, dropping reply");
    }
}
