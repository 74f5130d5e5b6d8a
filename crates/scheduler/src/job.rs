use std::future::Future;

use async_trait::async_trait;

/// A unit of background work the scheduler can run.
///
/// An error is logged by the scheduler and, for recurring jobs, retried on
/// the next tick.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

/// Adapts an async closure into a [`Job`].
///
/// ```ignore
/// let job = FnJob::new(move || {
///     let ingestor = ingestor.clone();
///     async move { ingestor.refresh().await.map(|_| ()).map_err(Into::into) }
/// });
/// ```
pub struct FnJob<F> {
    f: F,
}

impl<F, Fut> FnJob<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self.f)().await
    }
}
