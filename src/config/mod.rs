// src/config/mod.rs
//! Runtime settings: defaults, then config file, then environment.
//! CLI flags are applied on top by the binary.

pub mod file;

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::file::{load_file_config, resolve_config_path, FileConfig};
use crate::ingest::fetch::RetryPolicy;
use crate::ingest::Pacing;

pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_CONTENT_DIR: &str = "content/photos";
pub const DEFAULT_ASSETS_DIR: &str = "static/images/photos";
pub const DEFAULT_ASSET_URL_PREFIX: &str = "/images/photos";
pub const DEFAULT_SAMPLE_FEED: &str = "data/flickr-sample.xml";
pub const DEFAULT_AUTHOR: &str = "Flickr";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub user_id: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub oauth_token: Option<String>,
    pub oauth_token_secret: Option<String>,
    pub limit: usize,
    pub content_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub asset_url_prefix: String,
    pub sample_feed: PathBuf,
    /// The account's own username tag, dropped from every photo's tags.
    pub owner_tag: String,
    pub author: String,
    /// Sent as Referer on every request.
    pub site_url: String,
    pub low_quality: bool,
    pub skip_exif: bool,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_id: None,
            api_key: None,
            api_secret: None,
            oauth_token: None,
            oauth_token_secret: None,
            limit: DEFAULT_LIMIT,
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            asset_url_prefix: DEFAULT_ASSET_URL_PREFIX.to_string(),
            sample_feed: PathBuf::from(DEFAULT_SAMPLE_FEED),
            owner_tag: String::new(),
            author: DEFAULT_AUTHOR.to_string(),
            site_url: String::new(),
            low_quality: false,
            skip_exif: false,
            pacing: Pacing::default(),
            retry: RetryPolicy::standard(),
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Settings {
    /// Layered load using the process environment.
    pub fn load(explicit_config: Option<&Path>) -> Result<Self> {
        let env = |k: &str| std::env::var(k).ok();
        Self::load_with(explicit_config, &env)
    }

    /// Layered load with an injectable environment lookup.
    pub fn load_with(
        explicit_config: Option<&Path>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(path) = resolve_config_path(explicit_config, env)? {
            let file = load_file_config(&path)?;
            tracing::debug!(target: "flickr_sync::config", path = %path.display(), "loaded config file");
            settings.apply_file(file);
        }
        settings.apply_env(env)?;
        Ok(settings)
    }

    pub fn apply_file(&mut self, f: FileConfig) {
        if let Some(v) = non_empty(f.user_id) {
            self.user_id = Some(v);
        }
        if let Some(v) = f.limit {
            self.limit = v;
        }
        if let Some(v) = f.content_dir {
            self.content_dir = v;
        }
        if let Some(v) = f.assets_dir {
            self.assets_dir = v;
        }
        if let Some(v) = f.asset_url_prefix {
            self.asset_url_prefix = v;
        }
        if let Some(v) = f.sample_feed {
            self.sample_feed = v;
        }
        if let Some(v) = f.owner_tag {
            self.owner_tag = v.trim().to_string();
        }
        if let Some(v) = non_empty(f.author) {
            self.author = v;
        }
        if let Some(v) = f.site_url {
            self.site_url = v.trim().to_string();
        }
        if let Some(v) = f.low_quality {
            self.low_quality = v;
        }
        if let Some(v) = f.skip_exif {
            self.skip_exif = v;
        }
        if let Some(p) = f.pacing {
            if let Some(ms) = p.item_delay_ms {
                self.pacing.item_delay = Duration::from_millis(ms);
            }
            if let Some(n) = p.batch_size {
                self.pacing.batch_size = n;
            }
            if let Some(ms) = p.batch_delay_ms {
                self.pacing.batch_delay = Duration::from_millis(ms);
            }
        }
        if let Some(r) = f.retry {
            if let Some(n) = r.max_attempts {
                self.retry.max_attempts = n;
            }
            if let Some(ms) = r.base_delay_ms {
                self.retry.base_delay = Duration::from_millis(ms);
            }
        }
    }

    pub fn apply_env(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = non_empty(env("FLICKR_USER_ID")) {
            self.user_id = Some(v);
        }
        if let Some(v) = non_empty(env("FLICKR_API_KEY")) {
            self.api_key = Some(v);
        }
        if let Some(v) = non_empty(env("FLICKR_API_SECRET")) {
            self.api_secret = Some(v);
        }
        if let Some(v) = non_empty(env("FLICKR_OAUTH_TOKEN")) {
            self.oauth_token = Some(v);
        }
        if let Some(v) = non_empty(env("FLICKR_OAUTH_TOKEN_SECRET")) {
            self.oauth_token_secret = Some(v);
        }
        if let Some(v) = non_empty(env("PHOTO_LIMIT")) {
            self.limit = v
                .parse()
                .map_err(|_| anyhow!("PHOTO_LIMIT must be a positive integer, got {v:?}"))?;
        }
        Ok(())
    }

    /// Checks that only matter for a networked run.
    pub fn validate(&self, sample: bool) -> Result<()> {
        if self.limit == 0 {
            return Err(anyhow!("photo limit must be at least 1"));
        }
        if self.pacing.batch_size == 0 {
            return Err(anyhow!("pacing.batch_size must be at least 1"));
        }
        if !sample && self.user_id.is_none() {
            return Err(anyhow!(
                "FLICKR_USER_ID is required unless --sample is given"
            ));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
