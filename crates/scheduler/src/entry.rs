use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::job::Job;

/// How often a registered job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// Run once on the next tick, then drop the job whether it succeeded or not.
    OneShot,
    /// Run whenever at least this long has passed since the last success.
    Recurring(Duration),
}

/// Scheduling state for one registered job.
pub(crate) struct JobEntry {
    pub id: u64,
    pub name: String,
    pub job: Arc<dyn Job>,
    pub mode: JobMode,
    /// Registration time until the first successful run.
    pub last_run: Instant,
    /// Set while a tick is executing the job.
    pub in_flight: bool,
}

impl JobEntry {
    pub fn is_due(&self, now: Instant) -> bool {
        if self.in_flight {
            return false;
        }
        match self.mode {
            JobMode::OneShot => true,
            JobMode::Recurring(interval) => now.saturating_duration_since(self.last_run) >= interval,
        }
    }
}
