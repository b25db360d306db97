//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

pub use crate::config::ApiConfig;
use crate::hub::{HubConfig, TelemetryHub};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// The relay every transport feeds into
    pub hub: Arc<TelemetryHub>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state around an existing hub
    pub fn new(hub: Arc<TelemetryHub>, config: ApiConfig) -> Self {
        Self {
            hub,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Create state with a fresh hub built from `hub_config`
    pub fn with_hub_config(config: ApiConfig, hub_config: HubConfig) -> Self {
        Self::new(Arc::new(TelemetryHub::new(hub_config)), config)
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get live connection count
    pub fn connection_count(&self) -> usize {
        self.hub.connection_count()
    }
}
