//! Single-attempt access to the upstream breed catalog.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use dogmirror_core::config::UpstreamConfig;

use crate::error::FetchError;

/// One request for one upstream page. No retries at this level.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch page `page` and return its raw items.
    async fn get_page(&self, page: u32) -> Result<Vec<Value>, FetchError>;
}

/// `GET <base_url>?page=N` over a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Build an upstream whose every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, FetchError> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_page(&self, page: u32) -> Result<Vec<Value>, FetchError> {
        debug!(url = %self.base_url, page, "requesting upstream page");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("page", page)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        match response.json::<Value>().await? {
            Value::Array(items) => Ok(items),
            other => Err(FetchError::Shape(json_kind(&other))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
