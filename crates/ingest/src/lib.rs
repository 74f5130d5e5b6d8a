//! Ingestion pipeline: fetch upstream pages with retries, validate, and
//! upsert into the [`DogStore`](dogmirror_storage::DogStore).

pub mod error;
pub mod fetch;
pub mod runner;
pub mod status;
pub mod upstream;

pub use error::{FetchError, IngestError};
pub use fetch::{FetchClient, PageSource, RetryPolicy};
pub use runner::{Ingestor, RunReport, StopReason};
pub use status::IngestStatus;
pub use upstream::{HttpUpstream, Upstream};
