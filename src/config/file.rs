// src/config/file.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "FLICKR_SYNC_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/flickr_sync.toml";
pub const DEFAULT_JSON_PATH: &str = "config/flickr_sync.json";

/// On-disk configuration. Every field is optional; missing ones keep their defaults.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
    pub content_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
    pub asset_url_prefix: Option<String>,
    pub sample_feed: Option<PathBuf>,
    pub owner_tag: Option<String>,
    pub author: Option<String>,
    pub site_url: Option<String>,
    pub low_quality: Option<bool>,
    pub skip_exif: Option<bool>,
    pub pacing: Option<PacingConfig>,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    pub item_delay_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

/// Load a config file from an explicit path. Supports TOML or JSON formats.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_file_config(&content, &ext).with_context(|| format!("parsing {}", path.display()))
}

/// Which file to load:
/// 1) the explicit `--config` path
/// 2) $FLICKR_SYNC_CONFIG_PATH
/// 3) config/flickr_sync.toml
/// 4) config/flickr_sync.json
///
/// An explicit path that does not exist is an error; missing defaults are not.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if p.exists() {
            return Ok(Some(p.to_path_buf()));
        }
        return Err(anyhow!("config file {} does not exist", p.display()));
    }
    if let Some(p) = env(ENV_CONFIG_PATH).filter(|p| !p.trim().is_empty()) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return Ok(Some(pb));
        }
    }
    Ok(None)
}

fn parse_file_config(s: &str, hint_ext: &str) -> Result<FileConfig> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return serde_json::from_str(s).map_err(|e| anyhow!("invalid JSON config: {e}"));
    }
    toml::from_str(s).map_err(|e| anyhow!("invalid TOML config: {e}"))
}
