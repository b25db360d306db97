//! Data Transfer Objects
//!
//! Response types for the API endpoints. Request bodies are readings and
//! are parsed by the hub itself.

use serde::{Deserialize, Serialize};

use crate::hub::{Ack, HubStats};

// ============================================
// INGEST DTOs
// ============================================

/// Connectionless ingest acknowledgment
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Always true; failures use the error body instead
    pub ok: bool,
    /// Subscribers the reading was offered to
    pub recipients: usize,
    /// Acceptance time (ms since epoch)
    pub accepted_at: i64,
}

impl From<Ack> for IngestResponse {
    fn from(ack: Ack) -> Self {
        Self {
            ok: true,
            recipients: ack.recipients,
            accepted_at: ack.accepted_at,
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
    /// Open subscriber connections
    pub connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

// ============================================
// STATS DTOs
// ============================================

/// Hub counters
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub connections: usize,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub readings_broadcast: u64,
    pub deliveries: u64,
    pub deliveries_dropped: u64,
}

impl From<HubStats> for StatsResponse {
    fn from(stats: HubStats) -> Self {
        Self {
            connections: stats.connections,
            connections_opened: stats.connections_opened,
            connections_closed: stats.connections_closed,
            readings_broadcast: stats.readings_broadcast,
            deliveries: stats.deliveries,
            deliveries_dropped: stats.deliveries_dropped,
        }
    }
}
