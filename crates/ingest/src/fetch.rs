//! Retrying page fetcher.
//!
//! [`FetchClient`] wraps any [`Upstream`] with a bounded number of attempts
//! and exponential backoff (`base * 2^(attempt-1)`, no jitter, clamped to
//! `max_delay`). Every attempt failure is logged and swallowed; only running
//! out of attempts is reported to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use dogmirror_core::config::UpstreamConfig;

use crate::error::FetchError;
use crate::upstream::Upstream;

/// Source of upstream pages as seen by the ingestion runner.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Items on `page`, or an error once the source has given up on it.
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, FetchError>;
}

/// Attempt budget and backoff curve for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            base_delay: config.retry_delay,
            max_delay: config.retry_max_delay,
        }
    }

    /// Wait before the attempt that follows attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// An [`Upstream`] with retries.
#[derive(Debug)]
pub struct FetchClient<U> {
    upstream: U,
    policy: RetryPolicy,
}

impl<U: Upstream> FetchClient<U> {
    pub fn new(upstream: U, policy: RetryPolicy) -> Self {
        Self { upstream, policy }
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<U: Upstream> PageSource for FetchClient<U> {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, FetchError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            info!(page, attempt, "fetching upstream page");

            match self.upstream.get_page(page).await {
                Ok(items) => {
                    info!(page, items = items.len(), "fetched upstream page");
                    return Ok(items);
                }
                Err(e) if attempt >= attempts => {
                    error!(page, attempts, error = %e, "giving up on upstream page");
                    return Err(FetchError::Exhausted {
                        page,
                        attempts,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        page,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "upstream attempt failed"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::json;
    use tokio::time::Instant;

    use super::*;

    /// Upstream that replays a fixed script and records when it was called.
    struct ScriptedUpstream {
        script: Mutex<VecDeque<Result<Vec<Value>, FetchError>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedUpstream {
        fn new(script: Vec<Result<Vec<Value>, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn get_page(&self, _page: u32) -> Result<Vec<Value>, FetchError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Status(503)))
        }
    }

    fn assert_gap(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_clamped() {
        let policy = RetryPolicy {
            max_attempts: 100,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(policy.delay_after(6), Duration::from_secs(30));
        assert_eq!(policy.delay_after(64), Duration::from_secs(30));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_immediately() {
        let client = FetchClient::new(
            ScriptedUpstream::new(vec![Ok(vec![json!({"breed": "Pug"})])]),
            RetryPolicy::default(),
        );

        let items = client.fetch_page(1).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(client.upstream().call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_second_attempt() {
        let client = FetchClient::new(
            ScriptedUpstream::new(vec![Err(FetchError::Status(500)), Ok(vec![])]),
            RetryPolicy::default(),
        );

        let items = client.fetch_page(4).await.unwrap();
        assert!(items.is_empty());

        let calls = client.upstream().call_times();
        assert_eq!(calls.len(), 2);
        assert_gap(calls[1] - calls[0], Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_three_attempts_with_backoff() {
        let client = FetchClient::new(
            ScriptedUpstream::new(vec![
                Err(FetchError::Status(500)),
                Err(FetchError::Shape("an object")),
                Err(FetchError::Status(502)),
            ]),
            RetryPolicy::default(),
        );

        let err = client.fetch_page(9).await.unwrap_err();
        match err {
            FetchError::Exhausted { page, attempts, last } => {
                assert_eq!(page, 9);
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Status(502)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }

        let calls = client.upstream().call_times();
        assert_eq!(calls.len(), 3, "exactly three upstream calls");
        assert_gap(calls[1] - calls[0], Duration::from_secs(1));
        assert_gap(calls[2] - calls[1], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let client = FetchClient::new(ScriptedUpstream::new(vec![]), policy);

        assert!(client.fetch_page(1).await.is_err());
        assert_eq!(client.upstream().call_times().len(), 1);
    }
}
