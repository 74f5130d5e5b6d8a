//! Shared application state handed to every handler.

use std::sync::Arc;

use dogmirror_ingest::IngestStatus;
use dogmirror_storage::DogStore;

pub struct AppState {
    pub store: DogStore,
    /// Same cell the ingestor writes; handlers only read it.
    pub status: Arc<IngestStatus>,
    pub items_per_page: usize,
}
