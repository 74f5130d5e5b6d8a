use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use dogmirror_core::config::SchedulerConfig;

use crate::entry::{JobEntry, JobMode};
use crate::job::Job;

/// Longest `stop()` waits for the loop to finish its current tick.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

type JobTable = Arc<Mutex<Vec<JobEntry>>>;

/// One started polling loop and the channel that tells it to exit. Every
/// `start()` gets a fresh channel, so a loop abandoned by a timed-out
/// `stop()` can never be told to keep going.
struct RunningLoop {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// Polling scheduler for one-shot and recurring background jobs.
///
/// Construct one explicitly and share it by reference; there is no global
/// instance.
pub struct JobScheduler {
    jobs: JobTable,
    next_id: AtomicU64,
    poll_interval: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl JobScheduler {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
            poll_interval,
            running: Mutex::new(None),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.poll_interval)
    }

    /// Add a job. Recurring jobs count their first interval from now.
    pub fn register_job(&self, name: impl Into<String>, job: Arc<dyn Job>, mode: JobMode) {
        let name = name.into();
        match mode {
            JobMode::OneShot => info!("Registered one-shot job: {}", name),
            JobMode::Recurring(interval) => {
                info!("Registered recurring job: {} (every {}s)", name, interval.as_secs())
            }
        }

        let entry = JobEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name,
            job,
            mode,
            last_run: Instant::now(),
            in_flight: false,
        };
        lock(&self.jobs).push(entry);
    }

    /// Names of the jobs still scheduled, in registration order.
    pub fn active_jobs(&self) -> Vec<String> {
        lock(&self.jobs).iter().map(|e| e.name.clone()).collect()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.running)
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Spawn the polling loop. The first tick happens immediately.
    pub fn start(&self) {
        let mut running = lock(&self.running);
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            warn!("Job scheduler already running");
            return;
        }

        let (shutdown, receiver) = watch::channel(false);
        let jobs = Arc::clone(&self.jobs);
        let poll = self.poll_interval;

        *running = Some(RunningLoop {
            handle: tokio::spawn(run_loop(jobs, poll, receiver)),
            shutdown,
        });
        info!("Job scheduler started (poll every {}ms)", poll.as_millis());
    }

    /// Signal the loop to exit and wait up to 5s for the tick in progress.
    /// A job still running after that is left to finish on its own, and its
    /// loop exits as soon as it does.
    pub async fn stop(&self) {
        let running = lock(&self.running).take();
        let Some(RunningLoop { mut handle, shutdown }) = running else {
            return;
        };

        shutdown.send_replace(true);
        match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => info!("Job scheduler stopped"),
            Ok(Err(e)) => error!("Job scheduler loop ended abnormally: {}", e),
            Err(_) => warn!(
                "Job scheduler did not stop within {}s, leaving current job to finish",
                STOP_TIMEOUT.as_secs()
            ),
        }
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        if let Some(running) = lock(&self.running).take() {
            running.shutdown.send_replace(true);
        }
    }
}

// ── Loop ────────────────────────────────────────────────────────

async fn run_loop(jobs: JobTable, poll: Duration, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        run_due_jobs(&jobs).await;

        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Job scheduler loop exited");
}

/// One tick: claim every due job, run them in registration order, then drop
/// finished one-shots and stamp successful recurring runs with the tick time.
async fn run_due_jobs(jobs: &JobTable) {
    let now = Instant::now();
    let due: Vec<(u64, String, Arc<dyn Job>, JobMode)> = lock(jobs)
        .iter_mut()
        .filter(|e| e.is_due(now))
        .map(|e| {
            e.in_flight = true;
            (e.id, e.name.clone(), Arc::clone(&e.job), e.mode)
        })
        .collect();

    for (id, name, job, mode) in due {
        info!("Running job: {}", name);
        let started = Instant::now();

        // A panicking job surfaces as a JoinError instead of killing the loop.
        let succeeded = match tokio::spawn(async move { job.run().await }).await {
            Ok(Ok(())) => {
                info!(
                    job = %name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );
                true
            }
            Ok(Err(e)) => {
                let chain = format!("{e:#}");
                error!(job = %name, error = %chain, "Job failed");
                false
            }
            Err(e) => {
                error!(job = %name, error = %e, "Job panicked");
                false
            }
        };

        let mut table = lock(jobs);
        if mode == JobMode::OneShot {
            table.retain(|e| e.id != id);
        } else if let Some(entry) = table.iter_mut().find(|e| e.id == id) {
            entry.in_flight = false;
            if succeeded {
                entry.last_run = now;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
