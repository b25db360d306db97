//! Ingest Routes
//!
//! Connectionless ingestion for producers that cannot hold a socket open,
//! such as microcontrollers posting one reading per request.
//!
//! - POST /api/v1/readings - Single reading
//! - POST /esp32 - Same, at the path devices already post to

use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use crate::api::dto::IngestResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// POST /api/v1/readings
///
/// Broadcast one reading to every connected subscriber. The body must be a
/// JSON object; no particular fields are required. No content type is
/// required either, since devices often omit it.
pub async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<IngestResponse>> {
    let ack = state.hub.ingest_request_body(&body)?;

    tracing::debug!(recipients = ack.recipients, "Reading ingested over HTTP");

    Ok(Json(ack.into()))
}
