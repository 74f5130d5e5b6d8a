use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DogMirrorError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upstream: UpstreamConfig,
    pub ingest: IngestConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            storage: StorageConfig::from_env(),
            upstream: UpstreamConfig::from_env(),
            ingest: IngestConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
        }
    }

    /// Reject values that would make the pipeline loop forever or divide by zero.
    pub fn validate(&self) -> Result<(), DogMirrorError> {
        let checks: [(&str, u64); 4] = [
            ("MAX_RETRIES", self.upstream.max_retries as u64),
            ("ITEMS_PER_PAGE", self.server.items_per_page as u64),
            ("MAX_EXTERNAL_PAGES", self.ingest.max_pages as u64),
            ("FAILURE_STOP_THRESHOLD", self.ingest.failure_stop_threshold as u64),
        ];
        for (key, value) in checks {
            if value == 0 {
                return Err(DogMirrorError::Config {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.scheduler.poll_interval.is_zero() {
            return Err(DogMirrorError::Config {
                key: "SCHEDULER_POLL_MS".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1ms".to_string(),
            });
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:     {}:{} (page size {})", self.server.host, self.server.port, self.server.items_per_page);
        tracing::info!("  storage:    db_path={}", self.storage.db_path.display());
        tracing::info!(
            "  upstream:   url={}, timeout={}s, retries={}, base_delay={}ms",
            self.upstream.base_url,
            self.upstream.timeout.as_secs(),
            self.upstream.max_retries,
            self.upstream.retry_delay.as_millis()
        );
        tracing::info!(
            "  ingest:     max_pages={}, failure_stop={}, bootstrap_pages={}",
            self.ingest.max_pages,
            self.ingest.failure_stop_threshold,
            self.ingest.bootstrap_pages
        );
        tracing::info!(
            "  scheduler:  refresh={}s, poll={}ms",
            self.scheduler.refresh_interval.as_secs(),
            self.scheduler.poll_interval.as_millis()
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Page size of the read API.
    pub items_per_page: usize,
}

impl ServerConfig {
    fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: env_or("HOST", &d.host),
            port: env_parse("PORT", d.port),
            cors_origin: env_or("CORS_ORIGIN", &d.cors_origin),
            items_per_page: env_parse("ITEMS_PER_PAGE", d.items_per_page),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origin: "*".to_string(),
            items_per_page: 15,
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            db_path: PathBuf::from(env_or("DB_PATH", "dogs_cache.db")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("dogs_cache.db"),
        }
    }
}

// ── Upstream ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Attempts per page, including the first one.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retry_max_delay: Duration,
}

impl UpstreamConfig {
    fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: env_or("UPSTREAM_BASE_URL", &d.base_url),
            timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT_SECS", d.timeout.as_secs())),
            max_retries: env_parse("MAX_RETRIES", d.max_retries),
            retry_delay: Duration::from_millis(env_parse(
                "RETRY_DELAY_MS",
                d.retry_delay.as_millis() as u64,
            )),
            retry_max_delay: Duration::from_millis(env_parse(
                "RETRY_MAX_DELAY_MS",
                d.retry_max_delay.as_millis() as u64,
            )),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://interview-api-olive.vercel.app/api/dogs".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
        }
    }
}

// ── Ingestion runs ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Absolute upper page bound for any run.
    pub max_pages: u32,
    /// Consecutive page failures that end a run early.
    pub failure_stop_threshold: u32,
    /// Pages fetched synchronously at startup when the store is empty.
    pub bootstrap_pages: u32,
}

impl IngestConfig {
    fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_pages: env_parse("MAX_EXTERNAL_PAGES", d.max_pages),
            failure_stop_threshold: env_parse("FAILURE_STOP_THRESHOLD", d.failure_stop_threshold),
            bootstrap_pages: env_parse("BOOTSTRAP_PAGES", d.bootstrap_pages),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            failure_stop_threshold: 10,
            bootstrap_pages: 5,
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub refresh_interval: Duration,
    pub poll_interval: Duration,
}

impl SchedulerConfig {
    fn from_env() -> Self {
        let d = Self::default();
        Self {
            refresh_interval: Duration::from_secs(env_parse(
                "CACHE_REFRESH_INTERVAL_SECS",
                d.refresh_interval.as_secs(),
            )),
            poll_interval: Duration::from_millis(env_parse(
                "SCHEDULER_POLL_MS",
                d.poll_interval.as_millis() as u64,
            )),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(600),
            poll_interval: Duration::from_secs(1),
        }
    }
}
