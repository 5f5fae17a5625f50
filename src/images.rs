// src/images.rs
//! Local copies of photos under the assets directory.

use anyhow::{anyhow, Context, Result};
use metrics::{counter, histogram};
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::ingest::fetch::{with_retry, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    AlreadyPresent(PathBuf),
    DryRun(PathBuf),
    Failed(String),
}

impl DownloadOutcome {
    /// True when a local file exists (or would, in a dry run).
    pub fn has_local_copy(&self) -> bool {
        !matches!(self, DownloadOutcome::Failed(_))
    }
}

pub fn image_file_name(photo_id: &str) -> String {
    format!("flickr-{photo_id}.jpg")
}

pub struct ImageDownloader {
    client: reqwest::Client,
    assets_dir: PathBuf,
    url_prefix: String,
    retry: RetryPolicy,
    timeout: Duration,
    force: bool,
    dry_run: bool,
}

impl ImageDownloader {
    pub fn new(client: reqwest::Client, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            assets_dir: assets_dir.into(),
            url_prefix: "/images/photos".to_string(),
            retry: RetryPolicy::standard(),
            timeout: Duration::from_secs(15),
            force: false,
            dry_run: false,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_flags(mut self, force: bool, dry_run: bool) -> Self {
        self.force = force;
        self.dry_run = dry_run;
        self
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn local_path(&self, photo_id: &str) -> PathBuf {
        self.assets_dir.join(image_file_name(photo_id))
    }

    /// Path the site serves the local copy from.
    pub fn site_path(&self, photo_id: &str) -> String {
        format!("{}/{}", self.url_prefix, image_file_name(photo_id))
    }

    pub async fn download(&self, url: &str, photo_id: &str) -> DownloadOutcome {
        let path = self.local_path(photo_id);
        if path.exists() && !self.force {
            tracing::debug!(target: "flickr_sync::images", path = %path.display(), "image already present");
            return DownloadOutcome::AlreadyPresent(path);
        }
        if self.dry_run {
            tracing::info!(target: "flickr_sync::images", url, path = %path.display(), "dry run, not downloading");
            return DownloadOutcome::DryRun(path);
        }

        let t0 = Instant::now();
        let target = path.as_path();
        let result = with_retry(&self.retry, "image download", move |_| async move {
            self.fetch_to(url, target).await
        })
        .await;
        histogram!("flickr_image_download_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match result {
            Ok(bytes) => {
                counter!("flickr_images_downloaded_total").increment(1);
                tracing::info!(target: "flickr_sync::images", photo_id, bytes, path = %path.display(), "saved image");
                DownloadOutcome::Saved(path)
            }
            Err(e) => {
                counter!("flickr_image_failures_total").increment(1);
                tracing::warn!(target: "flickr_sync::images", photo_id, url, error = ?e, "image download failed");
                DownloadOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<usize> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned {status}"));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(anyhow!("unexpected content type {content_type:?} from {url}"));
        }
        let bytes = resp.bytes().await.context("reading image body")?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(bytes.len())
    }
}
