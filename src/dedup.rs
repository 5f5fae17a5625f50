// src/dedup.rs
//! Which photos already have a content file.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::INDEX_FILE;
use crate::ingest::normalize::slugify;
use crate::ingest::types::PhotoRecord;

/// Why a record counts as already imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    PhotoId(String),
    Slug(String),
}

/// Snapshot of the content directory, rebuilt at the start of every run.
#[derive(Debug, Default, Clone)]
pub struct ExistingIndex {
    by_id: HashMap<String, String>,
    slugs: Vec<String>,
}

/// `photo_id: "<digits>"` from a content file's front matter.
pub fn extract_front_matter_id(content: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r#"(?im)^\s*photo_id:\s*"([0-9]+)""#).unwrap());
    re.captures(content).map(|c| c[1].to_string())
}

fn content_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_md = path.extension().and_then(|s| s.to_str()) == Some("md");
        let is_index = path.file_name().and_then(|s| s.to_str()) == Some(INDEX_FILE);
        if path.is_file() && is_md && !is_index {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ExistingIndex {
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut index = Self::default();
        for path in content_files(dir)? {
            let slug = stem(&path);
            match fs::read_to_string(&path) {
                Ok(body) => {
                    if let Some(id) = extract_front_matter_id(&body) {
                        index.by_id.entry(id).or_insert_with(|| slug.clone());
                    }
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "unreadable content file"),
            }
            index.slugs.push(slug);
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    pub fn slug_for_id(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Photo id first; otherwise a slug with the same taken-date prefix that
    /// contains the id suffix (or the slugified title when there is no id).
    pub fn find(&self, record: &PhotoRecord, slug: &str) -> Option<Match> {
        if let Some(id) = record.id.as_deref() {
            if let Some(file) = self.by_id.get(id) {
                return Some(Match::PhotoId(file.clone()));
            }
        }
        if let Some(existing) = self.slugs.iter().find(|s| s.as_str() == slug) {
            return Some(Match::Slug(existing.clone()));
        }
        let date_prefix = record.taken_at.format("%Y-%m-%d").to_string();
        let needle = match record.id_suffix() {
            Some(suffix) => suffix,
            None => slugify(&record.title),
        };
        if needle.is_empty() {
            return None;
        }
        self.slugs
            .iter()
            .find(|s| s.starts_with(&date_prefix) && s[date_prefix.len()..].contains(&needle))
            .map(|s| Match::Slug(s.clone()))
    }

    /// Record a file written during the current run.
    pub fn insert(&mut self, slug: &str, id: Option<&str>) {
        if let Some(id) = id {
            self.by_id.insert(id.to_string(), slug.to_string());
        }
        if !self.slugs.iter().any(|s| s == slug) {
            self.slugs.push(slug.to_string());
        }
    }
}

fn split_date_prefix(stem: &str) -> Option<(&str, &str)> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-(.+)$").unwrap());
    re.captures(stem).and_then(|c| {
        let date = c.get(1)?.as_str();
        let rest = c.get(2)?.as_str();
        Some((date, rest))
    })
}

/// Delete duplicate content files, keeping the earliest date prefix per group.
///
/// Files are grouped by front-matter photo id first, then whatever survives
/// is grouped by the part of the name after the date. Returns the removed
/// file names (or the ones that would be removed with `dry_run`).
pub fn remove_duplicates(dir: &Path, dry_run: bool) -> Result<Vec<String>> {
    struct Candidate {
        file: String,
        date: String,
        rest: String,
        id: Option<String>,
    }

    let mut candidates = Vec::new();
    for path in content_files(dir)? {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let slug = stem(&path);
        let Some((date, rest)) = split_date_prefix(&slug) else {
            continue;
        };
        let id = fs::read_to_string(&path)
            .ok()
            .and_then(|body| extract_front_matter_id(&body));
        candidates.push(Candidate {
            file,
            date: date.to_string(),
            rest: rest.to_string(),
            id,
        });
    }

    let mut removed: Vec<String> = Vec::new();

    let mut pass = |groups: BTreeMap<String, Vec<&Candidate>>, kind: &str| -> Result<()> {
        for (key, mut members) in groups {
            members.retain(|c| !removed.contains(&c.file));
            if members.len() < 2 {
                continue;
            }
            members.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.file.cmp(&b.file)));
            tracing::info!(target: "flickr_sync::dedupe", group = kind, key = %key, keep = %members[0].file, "duplicate group");
            for dup in &members[1..] {
                if !dry_run {
                    fs::remove_file(dir.join(&dup.file))
                        .with_context(|| format!("removing {}", dup.file))?;
                }
                tracing::info!(target: "flickr_sync::dedupe", file = %dup.file, dry_run, "removed duplicate");
                removed.push(dup.file.clone());
            }
        }
        Ok(())
    };

    let mut by_id: BTreeMap<String, Vec<&Candidate>> = BTreeMap::new();
    for c in &candidates {
        if let Some(id) = &c.id {
            by_id.entry(id.clone()).or_default().push(c);
        }
    }
    pass(by_id, "photo_id")?;

    let mut by_rest: BTreeMap<String, Vec<&Candidate>> = BTreeMap::new();
    for c in &candidates {
        by_rest.entry(c.rest.clone()).or_default().push(c);
    }
    pass(by_rest, "suffix")?;

    Ok(removed)
}
