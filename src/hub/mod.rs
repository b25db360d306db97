//! Telemetry Hub
//!
//! The relay kernel: keeps the set of live subscribers and fans every
//! accepted reading out to all of them.
//!
//! - **reading**: the opaque telemetry sample type
//! - **relay**: the hub, subscriber handles and counters
//! - **error**: producer-facing errors and per-delivery failures
//!
//! # Architecture
//!
//! ```text
//! Producer (HTTP)      ─┐
//!                       ├─→ TelemetryHub ─→ bounded queue ─→ Subscriber
//! Producer (WebSocket) ─┘        │        ─→ bounded queue ─→ Subscriber
//!                                └──────  ─→ bounded queue ─→ Subscriber
//! ```
//!
//! The hub knows nothing about HTTP or WebSocket framing; transports hold a
//! [`Subscription`] per connection and call the ingest operations.
//!
//! # Example
//!
//! ```rust
//! use telemetry_hub::hub::{HubConfig, TelemetryHub};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hub = TelemetryHub::new(HubConfig::default());
//! let mut dashboard = hub.connect();
//!
//! let ack = hub.ingest_request_body(br#"{"heartRate": 72}"#)?;
//! assert_eq!(ack.recipients, 1);
//!
//! let reading = dashboard.recv().await.unwrap();
//! assert_eq!(reading.get("heartRate"), Some(&serde_json::json!(72)));
//! # Ok(())
//! # }
//! ```

mod error;
mod reading;
mod relay;

pub use error::{DeliveryFailure, HubError, HubResult};
pub use reading::Reading;
pub use relay::{
    Ack, BroadcastReport, ConnectionId, HubConfig, HubStats, Subscription, TelemetryHub,
};
