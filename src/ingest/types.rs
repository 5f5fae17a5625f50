// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One photo, reconstructed per run from whichever payload shape the source returned.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct PhotoRecord {
    pub id: Option<String>, // Flickr photo id, when recoverable
    pub title: String,
    pub link: String, // photo page
    pub published_at: DateTime<Utc>,
    pub taken_at: DateTime<Utc>,
    pub description: String, // caption text (feed) or HTML (API)
    pub image_url: String,
    pub author: String,
    pub tags: Vec<String>, // ordered, no duplicates
}

impl PhotoRecord {
    /// Last four characters of the photo id, used as slug suffix.
    pub fn id_suffix(&self) -> Option<String> {
        self.id.as_deref().map(|id| {
            let n = id.chars().count();
            id.chars().skip(n.saturating_sub(4)).collect()
        })
    }

    pub fn add_tag(&mut self, tag: &str, owner_tag: &str) {
        let t = tag.trim();
        if t.is_empty() || t.eq_ignore_ascii_case(owner_tag) {
            return;
        }
        if !self.tags.iter().any(|x| x == t) {
            self.tags.push(t.to_string());
        }
    }
}

/// Where a batch of records came from. REST records can be enriched through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    RestApi,
    Feed,
    Sample,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::RestApi => "rest-api",
            SourceKind::Feed => "feed",
            SourceKind::Sample => "sample",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedBatch {
    pub origin: SourceKind,
    pub records: Vec<PhotoRecord>,
}

#[async_trait::async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<PhotoRecord>>;
    fn kind(&self) -> SourceKind;
    fn name(&self) -> &'static str;
}
