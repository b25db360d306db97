//! Hub error types
//!
//! The hub has no fatal error state. Producer-facing errors are limited to
//! input validation; per-subscriber delivery failures are reported as
//! [`DeliveryFailure`] values that are logged and counted, never returned.

use thiserror::Error;

/// Errors surfaced to producers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// Payload was not a well-formed structured value (a JSON object)
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

/// Why a single delivery attempt did not reach its subscriber
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The subscriber's queue is full; this reading is dropped for it only
    #[error("subscriber is lagging, reading dropped")]
    Lagging,

    /// The subscriber's receiving side has gone away
    #[error("subscriber connection is closed")]
    Closed,
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;
