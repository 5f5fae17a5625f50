// src/ingest/providers/feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::fetch::{get_text, with_retry, RetryPolicy};
use crate::ingest::normalize::{records_from_feed, NormalizeCtx};
use crate::ingest::types::{PhotoRecord, PhotoSource, SourceKind};

/// Shipped sample, written next to the content when `--sample` finds no file.
pub const SAMPLE_FEED: &str = include_str!("../../../data/flickr-sample.xml");

pub fn public_feed_url(user_id: &str) -> String {
    format!(
        "https://www.flickr.com/services/feeds/photos_public.gne?id={}",
        urlencoding::encode(user_id)
    )
}

/// Public RSS/Atom feed of one account, or a local copy of one.
pub struct FeedProvider {
    mode: Mode,
    ctx: NormalizeCtx,
}

enum Mode {
    Fixture(String),
    SampleFile(PathBuf),
    Http {
        url: String,
        client: reqwest::Client,
        retry: RetryPolicy,
        timeout: Duration,
    },
}

impl FeedProvider {
    pub fn from_fixture_str(s: &str, ctx: NormalizeCtx) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            ctx,
        }
    }

    pub fn from_sample_file(path: impl Into<PathBuf>, ctx: NormalizeCtx) -> Self {
        Self {
            mode: Mode::SampleFile(path.into()),
            ctx,
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client, ctx: NormalizeCtx) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
                retry: RetryPolicy::standard(),
                timeout: Duration::from_secs(10),
            },
            ctx,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        if let Mode::Http { retry, .. } = &mut self.mode {
            *retry = policy;
        }
        self
    }

    fn parse(&self, xml: &str) -> Result<Vec<PhotoRecord>> {
        let t0 = std::time::Instant::now();
        let records = records_from_feed(xml, &self.ctx).context("parsing flickr feed")?;
        histogram!("flickr_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("flickr_photos_listed_total", "source" => "feed").increment(records.len() as u64);
        Ok(records)
    }
}

/// Write the shipped sample feed to `path` unless something is already there.
pub fn ensure_sample_file(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, SAMPLE_FEED)
        .with_context(|| format!("writing sample feed to {}", path.display()))?;
    tracing::info!(path = %path.display(), "created sample feed");
    Ok(true)
}

#[async_trait]
impl PhotoSource for FeedProvider {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<PhotoRecord>> {
        let mut records = match &self.mode {
            Mode::Fixture(s) => self.parse(s)?,
            Mode::SampleFile(path) => {
                ensure_sample_file(path)?;
                let xml = std::fs::read_to_string(path)
                    .with_context(|| format!("reading sample feed {}", path.display()))?;
                self.parse(&xml)?
            }
            Mode::Http {
                url,
                client,
                retry,
                timeout,
            } => {
                // parse failures are retried too: Flickr sometimes serves an HTML error page
                with_retry(retry, "flickr feed", move |_| async move {
                    let body = get_text(client, url, *timeout).await?;
                    self.parse(&body)
                })
                .await
                .with_context(|| format!("fetching feed {url}"))?
            }
        };
        records.truncate(limit);
        Ok(records)
    }

    fn kind(&self) -> SourceKind {
        match self.mode {
            Mode::Http { .. } => SourceKind::Feed,
            Mode::Fixture(_) | Mode::SampleFile(_) => SourceKind::Sample,
        }
    }

    fn name(&self) -> &'static str {
        "flickr-feed"
    }
}
