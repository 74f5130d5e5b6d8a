//! Read API handlers.
//!
//! Handlers never trigger ingestion and never report ingestion failures;
//! the only error they surface is a store read failing.

mod dogs;
mod health;
mod stats;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;

pub use dogs::{list_dogs, DogsQuery};
pub use health::{health, HealthResponse};
pub use stats::{stats, StatsResponse};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

/// Log the cause and hide it behind a generic 500.
pub(crate) fn internal_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    error!("{}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error",
        }),
    )
}
