//! WebSocket Message Types
//!
//! Defines the JSON envelopes exchanged between connected clients
//! (dashboards and devices) and the hub. Every frame is tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::hub::Reading;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// A reading submitted by a producer on this connection
    SensorData {
        /// The reading, relayed verbatim
        data: Reading,
    },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
    /// A reading broadcast by the hub
    SensorUpdate {
        /// The reading exactly as submitted
        data: Reading,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
