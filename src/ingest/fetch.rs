// src/ingest/fetch.rs
use anyhow::{anyhow, Context, Result};
use metrics::counter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use std::future::Future;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("Mozilla/5.0 flickr-sync/", env!("CARGO_PKG_VERSION"));
pub const FEED_ACCEPT: &str = "application/atom+xml, application/rss+xml, text/xml";

/// Exponential backoff: after the n-th failure wait `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// 3 attempts, waits of 2s then 4s.
    pub const fn standard() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    pub fn delay_after(&self, failures: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << failures.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run `op` until it succeeds or the attempt ceiling is hit. `op` receives the
/// zero-based attempt number. The last error is returned on exhaustion.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max = policy.max_attempts.max(1);
    let mut failures = 0u32;
    loop {
        match op(failures).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                failures += 1;
                if failures >= max {
                    tracing::warn!(target: "flickr_sync::fetch", what, attempts = failures, error = %e, "giving up");
                    return Err(e);
                }
                let delay = policy.delay_after(failures);
                tracing::info!(
                    target: "flickr_sync::fetch",
                    what,
                    attempt = failures,
                    max_attempts = max,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "request failed, retrying"
                );
                counter!("flickr_fetch_retries_total").increment(1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Shared client: site User-Agent and Referer on every request.
pub fn http_client(referer: &str) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if !referer.is_empty() {
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer).context("invalid referer header")?,
        );
    }
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .context("building http client")
}

/// GET a text body, treating non-2xx as an error.
pub async fn get_text(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<String> {
    let resp = client
        .get(url)
        .header(ACCEPT, FEED_ACCEPT)
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow!("GET {url} returned {status}"));
    }
    resp.text().await.context("reading response body")
}
