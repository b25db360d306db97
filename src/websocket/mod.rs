//! WebSocket Real-Time Streaming
//!
//! The duplex channel transport for the hub. A single connection serves as
//! both producer and subscriber.
//!
//! ## Architecture
//!
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/ws`, receive a `connected` frame with their
//! connection ID, and from then on get a `sensor-update` frame for every
//! reading the hub broadcasts. Sending a `sensor-data` frame broadcasts a
//! reading to every connection, the sender included.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:3001/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'sensor-data', data: {heartRate: 72}}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'sensor-update') console.log('Reading:', msg.data);
//! };
//! ```

mod handler;
mod messages;

pub use handler::websocket_handler;
pub use messages::{ClientMessage, ServerMessage};
