// src/ingest/providers/mod.rs
pub mod feed;
pub mod rest_api;

use anyhow::{Context, Result};
use metrics::counter;

use crate::ingest::types::{FetchedBatch, PhotoSource};

/// Fetch from the first source, falling back to the next one when it is exhausted.
/// The last source's error is returned when every source fails.
pub async fn fetch_with_fallback(
    sources: &[Box<dyn PhotoSource>],
    limit: usize,
) -> Result<FetchedBatch> {
    let mut last_err = None;
    for (i, source) in sources.iter().enumerate() {
        match source.fetch_latest(limit).await {
            Ok(records) => {
                tracing::info!(
                    target: "flickr_sync::ingest",
                    source = source.name(),
                    photos = records.len(),
                    "fetched photo list"
                );
                return Ok(FetchedBatch {
                    origin: source.kind(),
                    records,
                });
            }
            Err(e) => {
                counter!("flickr_source_errors_total", "source" => source.name()).increment(1);
                if let Some(next) = sources.get(i + 1) {
                    tracing::warn!(
                        target: "flickr_sync::ingest",
                        error = ?e,
                        source = source.name(),
                        fallback = next.name(),
                        "source exhausted, falling back"
                    );
                }
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => Err(e).context("all photo sources failed"),
        None => anyhow::bail!("no photo sources configured"),
    }
}
