// src/ingest/providers/rest_api.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::flickr::FlickrClient;
use crate::ingest::fetch::{with_retry, RetryPolicy};
use crate::ingest::normalize::{record_from_listing, NormalizeCtx};
use crate::ingest::types::{PhotoRecord, PhotoSource, SourceKind};

/// Recent uploads of one account via `flickr.people.getPhotos`.
pub struct RestApiProvider {
    client: FlickrClient,
    user_id: String,
    retry: RetryPolicy,
    ctx: NormalizeCtx,
}

impl RestApiProvider {
    pub fn new(client: FlickrClient, user_id: impl Into<String>, ctx: NormalizeCtx) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            retry: RetryPolicy::standard(),
            ctx,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
}

#[async_trait]
impl PhotoSource for RestApiProvider {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<PhotoRecord>> {
        let client = &self.client;
        let user_id = self.user_id.as_str();
        let listed = with_retry(&self.retry, "flickr.people.getPhotos", move |_| async move {
            client.recent_photos(user_id, limit).await
        })
        .await
        .context("listing photos through the REST API")?;

        counter!("flickr_photos_listed_total", "source" => "rest-api")
            .increment(listed.len() as u64);

        let mut records: Vec<PhotoRecord> = listed
            .iter()
            .map(|p| record_from_listing(p, &self.user_id, &self.ctx))
            .collect();
        records.truncate(limit);
        Ok(records)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::RestApi
    }

    fn name(&self) -> &'static str {
        "flickr-rest-api"
    }
}
