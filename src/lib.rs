//! # Telemetry Hub
//!
//! Real-time telemetry relay: accepts sensor readings from devices and
//! clients and fans each one out to every connected dashboard.
//!
//! ## Features
//!
//! - **Two ingestion paths**: one-shot HTTP posts and a persistent WebSocket
//! - **Fan-out to all**: every open connection gets every reading, the
//!   sender included
//! - **Isolation**: a slow or dead subscriber never delays the others
//! - **Transient**: nothing is stored, late joiners see only new readings
//!
//! ## Modules
//!
//! - [`hub`]: The relay kernel (subscriber set, ingest, broadcast)
//! - [`websocket`]: Duplex channel transport
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML and environment configuration
//! - [`logging`]: Tracing setup
//!
//! ## Quick Start
//!
//! ```rust
//! use telemetry_hub::hub::{HubConfig, TelemetryHub};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = TelemetryHub::new(HubConfig::default());
//!
//!     let mut monitor = hub.connect();
//!     let device = hub.connect();
//!
//!     let reading = telemetry_hub::Reading::from_value(json!({"heartRate": 72}))?;
//!     hub.ingest_via_channel(&device.id(), reading);
//!
//!     let received = monitor.recv().await.unwrap();
//!     println!("heart rate: {}", received.get("heartRate").unwrap());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod hub;
pub mod logging;
pub mod websocket;

// Re-export top-level types for convenience
pub use hub::{
    Ack, BroadcastReport, ConnectionId, DeliveryFailure, HubConfig, HubError, HubResult,
    HubStats, Reading, Subscription, TelemetryHub,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use websocket::{websocket_handler, ClientMessage, ServerMessage};

pub use config::{generate_default_config, Config, ConfigError, ConfigSource, LoggingConfig};
