//! Shared record of the most recent completed ingestion run.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::runner::RunReport;

/// Written by the [`Ingestor`](crate::Ingestor) when a run completes, read
/// by anything serving requests. Hand out clones of the `Arc` the ingestor
/// owns rather than building a second one.
#[derive(Debug, Default)]
pub struct IngestStatus {
    last: RwLock<Option<CompletedRun>>,
}

#[derive(Debug, Clone)]
struct CompletedRun {
    finished_at: DateTime<Utc>,
    report: RunReport,
}

impl IngestStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish time of the last completed run; `None` until one completes.
    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|run| run.finished_at)
    }

    /// Report of the last completed run.
    pub fn last_report(&self) -> Option<RunReport> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|run| run.report.clone())
    }

    pub(crate) fn record(&self, finished_at: DateTime<Utc>, report: &RunReport) {
        let mut last = self.last.write().unwrap_or_else(PoisonError::into_inner);
        *last = Some(CompletedRun {
            finished_at,
            report: report.clone(),
        });
    }
}
