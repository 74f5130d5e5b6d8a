//! Ingestion runs: walk upstream pages, validate items, upsert each page as
//! one batch.
//!
//! A run ends on the first empty page, on a streak of failed pages, or at the
//! absolute page bound. The failure-streak stop cannot tell "upstream ran out
//! of pages" from "upstream is down for a while"; a run cut short that way is
//! only corrected by the next refresh.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use dogmirror_core::config::IngestConfig;
use dogmirror_core::{normalize, Record};
use dogmirror_storage::DogStore;

use crate::error::IngestError;
use crate::fetch::PageSource;
use crate::status::IngestStatus;

/// Longest slice of a rejected item echoed into the logs.
const REJECT_PREVIEW_CHARS: usize = 80;

/// Why a run stopped requesting pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Upstream returned an empty page: end of data.
    EmptyPage { page: u32 },
    /// `page` was the last of too many consecutive failed pages.
    FailureStreak { page: u32 },
    /// Every page up to the bound was requested.
    PageBound,
}

/// What one run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub start_page: u32,
    pub pages_requested: u32,
    pub pages_failed: u32,
    pub records_fetched: u64,
    pub records_accepted: u64,
    pub records_rejected: u64,
    /// Rows the store reported as inserted or changed.
    pub records_stored: u64,
    pub stop: StopReason,
}

impl RunReport {
    fn new(start_page: u32) -> Self {
        Self {
            start_page,
            pages_requested: 0,
            pages_failed: 0,
            records_fetched: 0,
            records_accepted: 0,
            records_rejected: 0,
            records_stored: 0,
            stop: StopReason::PageBound,
        }
    }
}

/// Drives ingestion runs against one page source and one store.
pub struct Ingestor {
    source: Arc<dyn PageSource>,
    store: DogStore,
    config: IngestConfig,
    status: Arc<IngestStatus>,
}

impl Ingestor {
    pub fn new(source: Arc<dyn PageSource>, store: DogStore, config: IngestConfig) -> Self {
        Self {
            source,
            store,
            config,
            status: Arc::new(IngestStatus::new()),
        }
    }

    /// Handle to the last-run cell, for whatever serves reads.
    pub fn status(&self) -> Arc<IngestStatus> {
        Arc::clone(&self.status)
    }

    pub fn store(&self) -> &DogStore {
        &self.store
    }

    /// Run from `start_page`, either for `max_pages` pages or until the
    /// catalog ends, never past the configured page bound. `Some(0)` means no
    /// page limit, same as `None`.
    ///
    /// Upstream failures only skip pages. A store error aborts the run;
    /// batches committed before it stay committed and the last-run time is
    /// not updated.
    pub async fn run(&self, start_page: u32, max_pages: Option<u32>) -> Result<RunReport, IngestError> {
        let start_page = start_page.max(1);
        let bound = self.config.max_pages.saturating_add(1);
        let end_page = match max_pages.filter(|&n| n > 0) {
            Some(n) => {
                info!("Fetching pages {}-{} from upstream", start_page, start_page.saturating_add(n).saturating_sub(1));
                start_page.saturating_add(n).min(bound)
            }
            None => {
                info!("Fetching all breeds from upstream (starting at page {})", start_page);
                bound
            }
        };

        let mut report = RunReport::new(start_page);
        let mut consecutive_failures = 0u32;

        for page in start_page..end_page {
            report.pages_requested += 1;

            let items = match self.source.fetch_page(page).await {
                Ok(items) => items,
                Err(e) => {
                    consecutive_failures += 1;
                    report.pages_failed += 1;
                    warn!(page, consecutive_failures, error = %e, "skipping page after fetch failure");

                    if consecutive_failures >= self.config.failure_stop_threshold {
                        info!(
                            page,
                            consecutive_failures,
                            "stopping run after consecutive failures (likely end of data)"
                        );
                        report.stop = StopReason::FailureStreak { page };
                        break;
                    }
                    continue;
                }
            };

            consecutive_failures = 0;

            if items.is_empty() {
                info!(page, "empty page, stopping run");
                report.stop = StopReason::EmptyPage { page };
                break;
            }

            let batch = validate_page(page, &items);
            report.records_fetched += items.len() as u64;
            report.records_accepted += batch.len() as u64;
            report.records_rejected += (items.len() - batch.len()) as u64;

            if !batch.is_empty() {
                let stored = self.store.upsert_batch(&batch).await?;
                report.records_stored += stored;
                info!(
                    page,
                    accepted = batch.len(),
                    fetched = items.len(),
                    stored,
                    "page processed"
                );
            }
        }

        self.status.record(Utc::now(), &report);

        let total = self.store.count().await?;
        info!(
            stored = report.records_stored,
            total_in_store = total,
            stop = ?report.stop,
            "run complete"
        );

        Ok(report)
    }

    /// Startup fill: when the store is empty, fetch the first
    /// `bootstrap_pages` pages so the first reads aren't empty. Returns
    /// `None` when the store already had data.
    pub async fn bootstrap(&self) -> Result<Option<RunReport>, IngestError> {
        let existing = self.store.count().await?;
        if existing > 0 {
            info!("Store has {} breeds, skipping initial fetch", existing);
            return Ok(None);
        }

        info!("Store empty, fetching first {} pages before serving", self.config.bootstrap_pages);
        let report = self.run(1, Some(self.config.bootstrap_pages)).await?;
        info!(
            "Initial fetch complete: {} breeds ready, background refresh will fetch the rest",
            report.records_stored
        );
        Ok(Some(report))
    }

    /// Full-catalog run with before/after store sizes in the log.
    pub async fn refresh(&self) -> Result<RunReport, IngestError> {
        let before = self.store.count().await?;
        info!("Refreshing store (currently {} breeds)", before);

        let report = self.run(1, None).await?;

        let after = self.store.count().await?;
        let change = after as i64 - before as i64;
        info!("Refresh complete: {} breeds ({:+} change)", after, change);
        Ok(report)
    }
}

/// Normalize every item on a page, logging and dropping rejects.
fn validate_page(page: u32, items: &[Value]) -> Vec<Record> {
    items
        .iter()
        .filter_map(|item| match normalize(item) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!(page, %reason, item = %preview(item), "rejected upstream item");
                None
            }
        })
        .collect()
}

fn preview(item: &Value) -> String {
    let text = item.to_string();
    if text.chars().count() <= REJECT_PREVIEW_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(REJECT_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}
