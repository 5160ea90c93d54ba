//! `reqwest` based [`Transport`] with bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::BoxError;
use crate::fetcher::Transport;

/// Settings of [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Redirects followed before giving up.
    pub max_redirects: usize,
    /// Extra attempts after a connection error, 5xx or 429.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each retry.
    pub retry_wait_min: Duration,
    /// Upper bound on the backoff.
    pub retry_wait_max: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("ogtag-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 5,
            max_retries: 4,
            retry_wait_min: Duration::from_secs(1),
            retry_wait_max: Duration::from_secs(30),
        }
    }
}

/// HTTP transport. Non-retryable statuses return their body as-is.
pub struct ReqwestTransport {
    client: Client,
    config: TransportConfig,
}

impl ReqwestTransport {
    /// Builds the HTTP client.
    pub fn new(config: TransportConfig) -> Result<Self, BoxError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.config
            .retry_wait_min
            .saturating_mul(factor)
            .min(self.config.retry_wait_max)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, target: &str) -> Result<Bytes, BoxError> {
        let mut attempt = 0;
        loop {
            let err: BoxError = match self.client.get(target).send().await {
                Ok(response) if is_retryable(response.status()) => {
                    format!("{} returned {}", target, response.status()).into()
                }
                Ok(response) => return Ok(response.bytes().await?),
                Err(e) => e.into(),
            };

            if attempt >= self.config.max_retries {
                return Err(err);
            }
            let wait = self.backoff(attempt);
            debug!(url = target, attempt, error = %err, ?wait, "retrying fetch");
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
