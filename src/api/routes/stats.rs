//! Stats Routes
//!
//! - GET /api/v1/stats - Hub connection and delivery counters

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::StatsResponse;
use crate::api::state::AppState;

/// GET /api/v1/stats
pub async fn hub_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(state.hub.stats().into())
}
