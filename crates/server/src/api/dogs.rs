//! `GET /api/dogs?page=N`: one page of the store, sorted by breed.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use dogmirror_core::Record;

use crate::state::AppState;

use super::{internal_error, ApiError};

/// `page` is taken as raw text so a non-integer falls back to page 1
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct DogsQuery {
    pub page: Option<String>,
}

impl DogsQuery {
    /// 1-based page number; missing or unparseable means 1.
    pub fn page_number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

pub async fn list_dogs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DogsQuery>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let per_page = state.items_per_page;
    let Some(offset) = page_offset(query.page_number(), per_page) else {
        return Ok(Json(Vec::new()));
    };

    let snapshot = state
        .store
        .snapshot()
        .await
        .map_err(|e| internal_error("failed to read dogs", e))?;

    let page = snapshot
        .into_iter()
        .skip(offset)
        .take(per_page)
        .map(|(breed, image)| Record { breed, image })
        .collect();
    Ok(Json(page))
}

/// Index of the first item on `page`, or `None` for pages below 1 or
/// offsets that don't fit in memory anyway.
fn page_offset(page: i64, per_page: usize) -> Option<usize> {
    let index = usize::try_from(page.checked_sub(1)?).ok()?;
    index.checked_mul(per_page)
}
