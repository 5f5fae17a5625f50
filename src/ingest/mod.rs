// src/ingest/mod.rs
pub mod fetch;
pub mod normalize;
pub mod providers;
pub mod types;

use anyhow::{anyhow, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::content::{ensure_index_file, render_content, slug_for, write_content, RenderInput};
use crate::dedup::ExistingIndex;
use crate::flickr::sizes::{plan_from_feed_url, plan_from_sizes, ImagePlan, Quality};
use crate::flickr::types::ExifSummary;
use crate::flickr::{Credentials, FlickrClient};
use crate::images::{DownloadOutcome, ImageDownloader};
use crate::ingest::fetch::http_client;
use crate::ingest::normalize::{apply_photo_info, NormalizeCtx};
use crate::ingest::providers::feed::{public_feed_url, FeedProvider};
use crate::ingest::providers::fetch_with_fallback;
use crate::ingest::providers::rest_api::RestApiProvider;
use crate::ingest::types::{FetchedBatch, PhotoRecord, PhotoSource, SourceKind};

/// One-time metrics registration (so series show up in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("flickr_photos_listed_total", "Photos listed by a source.");
        describe_counter!("flickr_photos_seen_total", "Photos considered by the pipeline.");
        describe_counter!(
            "flickr_photos_skipped_total",
            "Photos skipped because a content file already exists."
        );
        describe_counter!("flickr_photos_written_total", "Content files written.");
        describe_counter!("flickr_photos_failed_total", "Photos that failed to process.");
        describe_counter!("flickr_images_downloaded_total", "Images saved locally.");
        describe_counter!("flickr_image_failures_total", "Image downloads that gave up.");
        describe_counter!("flickr_fetch_retries_total", "Retried HTTP requests.");
        describe_counter!("flickr_source_errors_total", "Photo sources that failed.");
        describe_histogram!("flickr_feed_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("flickr_image_download_ms", "Image download time in milliseconds.");
        describe_gauge!("flickr_sync_last_run_ts", "Unix ts when the sync last ran.");
    });
}

/// Waits between processed photos, and a longer one after every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub item_delay: Duration,
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(1),
            batch_size: 5,
            batch_delay: Duration::from_secs(10),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            item_delay: Duration::ZERO,
            batch_size: usize::MAX,
            batch_delay: Duration::ZERO,
        }
    }

    /// Wait before the photo that follows `processed` earlier ones.
    pub fn delay_before(&self, processed: usize) -> Duration {
        if processed == 0 {
            Duration::ZERO
        } else if processed % self.batch_size.max(1) == 0 {
            self.batch_delay
        } else {
            self.item_delay
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub force: bool,
    pub dry_run: bool,
    pub quality: Quality,
    pub skip_exif: bool,
    pub download_images: bool,
}

pub struct RunContext {
    pub content_dir: PathBuf,
    pub options: RunOptions,
    pub pacing: Pacing,
    /// Present when an API key is configured and the run is not in sample mode.
    pub api: Option<FlickrClient>,
    pub downloader: ImageDownloader,
    pub owner_tag: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub seen: usize,
    pub skipped: usize,
    pub written: usize,
    pub failed: usize,
    pub images_downloaded: usize,
}

struct Processed {
    slug: String,
    image_saved: bool,
}

/// Materialize every record of a fetched batch. Per-photo failures are logged
/// and counted; only setup errors abort the run.
pub async fn run_once(batch: FetchedBatch, ctx: &RunContext) -> Result<RunSummary> {
    ensure_metrics_described();

    if !ctx.options.dry_run {
        ensure_index_file(&ctx.content_dir)?;
    }
    let mut index = ExistingIndex::scan(&ctx.content_dir)?;
    tracing::info!(
        target: "flickr_sync::ingest",
        existing = index.len(),
        photos = batch.records.len(),
        origin = batch.origin.as_str(),
        "starting run"
    );

    let mut summary = RunSummary::default();
    for record in batch.records {
        summary.seen += 1;
        counter!("flickr_photos_seen_total").increment(1);

        let slug = slug_for(&record);
        if !ctx.options.force {
            if let Some(m) = index.find(&record, &slug) {
                tracing::debug!(target: "flickr_sync::ingest", slug = %slug, existing = ?m, "already imported");
                summary.skipped += 1;
                counter!("flickr_photos_skipped_total").increment(1);
                continue;
            }
        }

        let processed = summary.written + summary.failed;
        let wait = ctx.pacing.delay_before(processed);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let id = record.id.clone();
        match process_photo(record, batch.origin, ctx).await {
            Ok(p) => {
                summary.written += 1;
                if p.image_saved {
                    summary.images_downloaded += 1;
                }
                counter!("flickr_photos_written_total").increment(1);
                index.insert(&p.slug, id.as_deref());
            }
            Err(e) => {
                summary.failed += 1;
                counter!("flickr_photos_failed_total").increment(1);
                tracing::warn!(target: "flickr_sync::ingest", error = ?e, photo_id = ?id, slug = %slug, "photo failed");
            }
        }
    }

    gauge!("flickr_sync_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
    tracing::info!(
        target: "flickr_sync::ingest",
        seen = summary.seen,
        skipped = summary.skipped,
        written = summary.written,
        failed = summary.failed,
        images = summary.images_downloaded,
        "run finished"
    );
    Ok(summary)
}

async fn process_photo(
    mut record: PhotoRecord,
    origin: SourceKind,
    ctx: &RunContext,
) -> Result<Processed> {
    let quality = ctx.options.quality;
    let mut plan: Option<ImagePlan> = None;
    let mut exif = ExifSummary::default();

    if let (Some(api), Some(id)) = (ctx.api.as_ref(), record.id.clone()) {
        if origin == SourceKind::RestApi {
            match api.photo_info(&id).await {
                Ok(info) => apply_photo_info(&mut record, &info, &ctx.owner_tag),
                Err(e) => tracing::warn!(target: "flickr_sync::ingest", photo_id = %id, error = %e, "getInfo failed"),
            }
            match api.photo_sizes(&id).await {
                Ok(sizes) => plan = plan_from_sizes(&sizes, quality),
                Err(e) => tracing::warn!(target: "flickr_sync::ingest", photo_id = %id, error = %e, "getSizes failed"),
            }
        }
        if !ctx.options.skip_exif {
            exif = api.photo_exif(&id).await;
        }
    }

    let plan = match plan {
        Some(p) => p,
        None if !record.image_url.is_empty() => plan_from_feed_url(&record.image_url, quality),
        None => {
            tracing::debug!(target: "flickr_sync::ingest", title = %record.title, "no image url, writing without one");
            ImagePlan {
                download_url: String::new(),
                display_url: String::new(),
                label: None,
            }
        }
    };

    let mut image_saved = false;
    let local_image = match record.id.as_deref() {
        Some(id) if ctx.options.download_images && !plan.download_url.is_empty() => {
            let outcome = ctx.downloader.download(&plan.download_url, id).await;
            image_saved = matches!(outcome, DownloadOutcome::Saved(_));
            outcome.has_local_copy().then(|| ctx.downloader.site_path(id))
        }
        _ => None,
    };

    let slug = slug_for(&record);
    let body = render_content(
        &record,
        &RenderInput {
            display_url: &plan.display_url,
            local_image: local_image.as_deref(),
            exif: Some(&exif),
        },
    );
    write_content(&ctx.content_dir, &slug, &body, ctx.options.dry_run)?;
    Ok(Processed { slug, image_saved })
}

/// Flags of one `sync` invocation that are not part of [`Settings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncFlags {
    pub force: bool,
    pub dry_run: bool,
    pub sample: bool,
    pub sample_images: bool,
}

/// Build the source chain and run context from settings, then run once.
///
/// Source order: the local sample feed in sample mode; otherwise the REST API
/// when an API key is configured, falling back to the public feed.
pub async fn run_sync(settings: &Settings, flags: SyncFlags) -> Result<RunSummary> {
    let sample = flags.sample || flags.sample_images;
    settings.validate(sample)?;

    let http = http_client(&settings.site_url)?;
    let norm = NormalizeCtx::new(settings.owner_tag.clone(), settings.author.clone());

    let api = match (&settings.api_key, sample) {
        (Some(key), false) => Some(FlickrClient::new(
            http.clone(),
            Credentials {
                api_key: key.clone(),
                api_secret: settings.api_secret.clone(),
                oauth_token: settings.oauth_token.clone(),
                oauth_token_secret: settings.oauth_token_secret.clone(),
            },
        )
        .with_retry(settings.retry)),
        _ => None,
    };

    let mut sources: Vec<Box<dyn PhotoSource>> = Vec::new();
    if sample {
        sources.push(Box::new(FeedProvider::from_sample_file(
            settings.sample_feed.clone(),
            norm,
        )));
    } else {
        let user_id = settings
            .user_id
            .as_deref()
            .ok_or_else(|| anyhow!("FLICKR_USER_ID is not set"))?;
        if let Some(client) = &api {
            sources.push(Box::new(
                RestApiProvider::new(client.clone(), user_id, norm.clone()).with_retry(settings.retry),
            ));
        }
        sources.push(Box::new(
            FeedProvider::from_url(public_feed_url(user_id), http.clone(), norm)
                .with_retry(settings.retry),
        ));
    }

    let batch = fetch_with_fallback(&sources, settings.limit).await?;

    let downloader = ImageDownloader::new(http, settings.assets_dir.clone())
        .with_url_prefix(settings.asset_url_prefix.clone())
        .with_retry(settings.retry)
        .with_flags(flags.force, flags.dry_run);

    let ctx = RunContext {
        content_dir: settings.content_dir.clone(),
        options: RunOptions {
            force: flags.force,
            dry_run: flags.dry_run,
            quality: if settings.low_quality { Quality::Low } else { Quality::High },
            skip_exif: settings.skip_exif,
            download_images: !flags.sample || flags.sample_images,
        },
        pacing: settings.pacing,
        api,
        downloader,
        owner_tag: settings.owner_tag.clone(),
    };
    run_once(batch, &ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacing_waits_longer_after_each_batch() {
        let p = Pacing::default();
        assert_eq!(p.delay_before(0), Duration::ZERO);
        assert_eq!(p.delay_before(1), Duration::from_secs(1));
        assert_eq!(p.delay_before(5), Duration::from_secs(10));
        assert_eq!(p.delay_before(6), Duration::from_secs(1));
        assert_eq!(Pacing::none().delay_before(5), Duration::ZERO);
    }
}
