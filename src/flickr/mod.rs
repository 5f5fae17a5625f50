// src/flickr/mod.rs
//! Thin typed client for the handful of Flickr REST methods we use.

pub mod error;
pub mod oauth;
pub mod sizes;
pub mod types;

pub use error::{FlickrError, Result};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::ingest::fetch::{with_retry, RetryPolicy};
use oauth::OAuthKeys;
use types::{
    ExifResponse, ExifSummary, ListedPhoto, PhotoInfo, PhotoInfoResponse, PhotosResponse,
    SizeDescriptor, SizesResponse,
};

pub const FLICKR_API_BASE: &str = "https://www.flickr.com/services/rest/";

/// Extras requested with `flickr.people.getPhotos` so a listing maps to a full record.
pub const LISTING_EXTRAS: &str = "date_taken,date_upload,description,tags,owner_name,url_m";

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: Option<String>,
    pub oauth_token: Option<String>,
    pub oauth_token_secret: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// All four OAuth values are present.
    pub fn oauth_keys(&self) -> Option<OAuthKeys> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Some(OAuthKeys {
            consumer_key: Some(self.api_key.clone()).filter(|k| !k.is_empty())?,
            consumer_secret: non_empty(&self.api_secret)?,
            token: non_empty(&self.oauth_token)?,
            token_secret: non_empty(&self.oauth_token_secret)?,
        })
    }
}

#[derive(Clone)]
pub struct FlickrClient {
    http: reqwest::Client,
    base_url: String,
    creds: Credentials,
    timeout: Duration,
    retry: RetryPolicy,
}

impl FlickrClient {
    pub fn new(http: reqwest::Client, creds: Credentials) -> Self {
        Self {
            http,
            base_url: FLICKR_API_BASE.to_string(),
            creds,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::standard(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Retry policy for the per-photo lookups. Listing retries are up to the caller.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn can_sign(&self) -> bool {
        self.creds.oauth_keys().is_some()
    }

    /// Call a REST method. `signed` uses OAuth when credentials allow it,
    /// otherwise the call falls back to plain `api_key` authentication.
    pub async fn call(&self, method: &str, params: &[(&str, String)], signed: bool) -> Result<Value> {
        if self.creds.api_key.is_empty() {
            return Err(FlickrError::MissingCredentials("FLICKR_API_KEY"));
        }

        let mut query: Vec<(String, String)> = vec![
            ("method".to_string(), method.to_string()),
            ("format".to_string(), "json".to_string()),
            ("nojsoncallback".to_string(), "1".to_string()),
        ];
        query.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));

        match self.creds.oauth_keys().filter(|_| signed) {
            Some(keys) => oauth::sign("GET", &self.base_url, &mut query, &keys),
            None => query.push(("api_key".to_string(), self.creds.api_key.clone())),
        }

        let resp = self
            .http
            .get(&self.base_url)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FlickrError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = resp.json().await?;
        if body.get("stat").and_then(Value::as_str) == Some("fail") {
            return Err(FlickrError::Api {
                code: body.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        Ok(body)
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<T> {
        let body = self.call(method, params, signed).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `call_typed` with backoff on transient failures. API refusals return at once.
    async fn call_retrying<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<T> {
        let outcome = with_retry(&self.retry, method, move |_| async move {
            match self.call_typed::<T>(method, params, signed).await {
                Err(e) if e.is_transient() => Err(e),
                other => Ok(other),
            }
        })
        .await;
        outcome.and_then(|r| r)
    }

    pub async fn recent_photos(&self, user_id: &str, per_page: usize) -> Result<Vec<ListedPhoto>> {
        let resp: PhotosResponse = self
            .call_typed(
                "flickr.people.getPhotos",
                &[
                    ("user_id", user_id.to_string()),
                    ("per_page", per_page.to_string()),
                    ("extras", LISTING_EXTRAS.to_string()),
                ],
                false,
            )
            .await?;
        Ok(resp.photos.photo)
    }

    pub async fn photo_info(&self, photo_id: &str) -> Result<PhotoInfo> {
        let resp: PhotoInfoResponse = self
            .call_retrying("flickr.photos.getInfo", &[("photo_id", photo_id.to_string())], false)
            .await?;
        Ok(resp.photo)
    }

    pub async fn photo_sizes(&self, photo_id: &str) -> Result<Vec<SizeDescriptor>> {
        let resp: SizesResponse = self
            .call_retrying("flickr.photos.getSizes", &[("photo_id", photo_id.to_string())], false)
            .await?;
        Ok(resp.sizes.size)
    }

    /// EXIF is frequently private. Tries a signed call first (when OAuth is
    /// configured), then an unsigned one; any failure yields an empty summary.
    pub async fn photo_exif(&self, photo_id: &str) -> ExifSummary {
        let params = [("photo_id", photo_id.to_string())];
        let mut attempts = vec![false];
        if self.can_sign() {
            attempts.insert(0, true);
        }
        for signed in attempts {
            match self
                .call_retrying::<ExifResponse>("flickr.photos.getExif", &params, signed)
                .await
            {
                Ok(resp) => return ExifSummary::from_tags(&resp.photo.exif),
                Err(e) if e.is_permission_denied() => {
                    tracing::debug!(photo_id, signed, "exif not permitted");
                }
                Err(e) => {
                    tracing::debug!(photo_id, signed, error = %e, "exif lookup failed");
                }
            }
        }
        ExifSummary::default()
    }
}
