//! Process wiring: open the store, build the ingestor, warm an empty store,
//! and register the background jobs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use dogmirror_core::Config;
use dogmirror_ingest::{FetchClient, HttpUpstream, Ingestor, RetryPolicy};
use dogmirror_scheduler::{FnJob, JobMode, JobScheduler};
use dogmirror_storage::DogStore;

use crate::state::AppState;

/// One-shot full catalog fetch queued at startup.
pub const FULL_FETCH_JOB: &str = "background_full_fetch";
/// Recurring full refresh.
pub const REFRESH_JOB: &str = "periodic_cache_refresh";

/// Everything `serve` needs to run and shut down cleanly.
pub struct App {
    pub state: Arc<AppState>,
    pub ingestor: Arc<Ingestor>,
    pub scheduler: JobScheduler,
}

/// Open the store and build an ingestor over the real upstream.
pub async fn build_ingestor(config: &Config) -> anyhow::Result<Ingestor> {
    let store = DogStore::open(&config.storage.db_path)
        .await
        .with_context(|| format!("failed to open store at {}", config.storage.db_path.display()))?;

    let upstream = HttpUpstream::from_config(&config.upstream).context("failed to build upstream client")?;
    info!("Upstream: {}", upstream.base_url());
    let client = FetchClient::new(upstream, RetryPolicy::from_config(&config.upstream));

    Ok(Ingestor::new(Arc::new(client), store, config.ingest.clone()))
}

/// Bootstrap the store, then start the scheduler with the full-fetch and
/// refresh jobs. Returns once the store is ready to serve reads.
pub async fn start(config: &Config) -> anyhow::Result<App> {
    let ingestor = Arc::new(build_ingestor(config).await?);
    start_with(config, ingestor).await
}

/// [`start`] over an already-built ingestor.
pub async fn start_with(config: &Config, ingestor: Arc<Ingestor>) -> anyhow::Result<App> {
    // A failed warm-up still serves whatever the store already holds.
    if let Err(e) = ingestor.bootstrap().await {
        error!("Initial fetch failed: {}", e);
    }

    let scheduler = JobScheduler::from_config(&config.scheduler);
    register_jobs(&scheduler, &ingestor, config.scheduler.refresh_interval);
    scheduler.start();

    let state = Arc::new(AppState {
        store: ingestor.store().clone(),
        status: ingestor.status(),
        items_per_page: config.server.items_per_page,
    });

    Ok(App {
        state,
        ingestor,
        scheduler,
    })
}

/// Queue the one-shot full fetch and the recurring refresh.
pub fn register_jobs(scheduler: &JobScheduler, ingestor: &Arc<Ingestor>, refresh_interval: Duration) {
    let full = Arc::clone(ingestor);
    scheduler.register_job(
        FULL_FETCH_JOB,
        Arc::new(FnJob::new(move || {
            let ingestor = Arc::clone(&full);
            async move {
                ingestor.run(1, None).await?;
                anyhow::Ok(())
            }
        })),
        JobMode::OneShot,
    );

    let periodic = Arc::clone(ingestor);
    scheduler.register_job(
        REFRESH_JOB,
        Arc::new(FnJob::new(move || {
            let ingestor = Arc::clone(&periodic);
            async move {
                ingestor.refresh().await?;
                anyhow::Ok(())
            }
        })),
        JobMode::Recurring(refresh_interval),
    );
}
