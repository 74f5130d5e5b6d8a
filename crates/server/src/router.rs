//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/dogs", get(api::list_dogs))
        .route("/api/stats", get(api::stats))
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin; anything else is taken as the single allowed origin.
pub fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!("Invalid CORS_ORIGIN {:?} ({}), allowing any origin", origin, e);
            CorsLayer::permissive()
        }
    }
}
