//! Ingestion error types.

use thiserror::Error;

use dogmirror_storage::StoreError;

/// A failed upstream page request.
///
/// Single attempts fail with `Http`, `Status` or `Shape`; the retrying
/// [`FetchClient`](crate::FetchClient) wraps the last of those in `Exhausted`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("expected a JSON array, got {0}")]
    Shape(&'static str),

    #[error("page {page} failed after {attempts} attempts: {last}")]
    Exhausted {
        page: u32,
        attempts: u32,
        last: Box<FetchError>,
    },
}

/// Errors that abort an ingestion run. Upstream failures never do; they only
/// skip pages.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
