//! `GET /api/stats`: store size, page count and last completed ingestion.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

use super::{internal_error, ApiError};

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_dogs: u64,
    pub total_pages: u64,
    pub items_per_page: usize,
    /// RFC 3339 finish time of the last completed run, `null` before the first.
    pub last_fetch: Option<String>,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let total_dogs = state
        .store
        .count()
        .await
        .map_err(|e| internal_error("failed to count dogs", e))?;

    Ok(Json(StatsResponse {
        total_dogs,
        total_pages: total_dogs.div_ceil(state.items_per_page.max(1) as u64),
        items_per_page: state.items_per_page,
        last_fetch: state.status.last_completed_at().map(|t| t.to_rfc3339()),
    }))
}
