// src/content.rs
//! Hugo content files: front matter, body shortcode, section index.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::flickr::types::ExifSummary;
use crate::ingest::normalize::slugify;
use crate::ingest::types::PhotoRecord;

pub const INDEX_FILE: &str = "_index.md";

const INDEX_BODY: &str = "---\ntitle: \"Photos\"\ndescription: \"Photos I've taken and shared on Flickr.\"\nurl: /photos/\n---\n";

/// `YYYY-MM-DD-<title>-<last 4 of id>`, date taken in UTC.
pub fn slug_for(record: &PhotoRecord) -> String {
    let mut title = slugify(&record.title);
    if title.is_empty() {
        title = "untitled".to_string();
    }
    let date = record.taken_at.format("%Y-%m-%d");
    match record.id_suffix() {
        Some(suffix) => format!("{date}-{title}-{suffix}"),
        None => format!("{date}-{title}"),
    }
}

pub fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Everything the template needs beyond the record itself.
#[derive(Debug, Clone, Default)]
pub struct RenderInput<'a> {
    /// URL shown on the site when no local copy exists.
    pub display_url: &'a str,
    /// Site path of the downloaded image, e.g. `/images/photos/flickr-1.jpg`.
    pub local_image: Option<&'a str>,
    pub exif: Option<&'a ExifSummary>,
}

pub fn render_content(record: &PhotoRecord, input: &RenderInput<'_>) -> String {
    let title = escape_quotes(&record.title);
    let taken = record.taken_at.to_rfc3339();
    let published = record.published_at.to_rfc3339();
    let display = if input.display_url.is_empty() {
        record.image_url.as_str()
    } else {
        input.display_url
    };
    let tags = record
        .tags
        .iter()
        .map(|t| format!("\"{}\"", escape_quotes(t)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::with_capacity(1024);
    out.push_str("---\n");
    let _ = writeln!(out, "title: \"{title}\"");
    let _ = writeln!(out, "date: {taken}");
    let _ = writeln!(out, "description: \"Photo: {title}\"");
    let _ = writeln!(out, "author: \"{}\"", escape_quotes(&record.author));
    out.push_str("type: \"photos\"\n");
    let _ = writeln!(out, "tags: [{tags}]");
    out.push_str("flickr:\n");
    let _ = writeln!(out, "  url: \"{}\"", escape_quotes(&record.link));
    let _ = writeln!(out, "  photo_id: \"{}\"", record.id.as_deref().unwrap_or(""));
    let _ = writeln!(out, "  image_url: \"{}\"", escape_quotes(display));
    let _ = writeln!(out, "  date_taken: \"{taken}\"");
    let _ = writeln!(out, "  date_published: \"{published}\"");
    if let Some(exif) = input.exif.filter(|e| !e.is_empty()) {
        out.push_str("  exif:\n");
        for (k, v) in &exif.entries {
            let _ = writeln!(out, "    {k}: \"{}\"", escape_quotes(v));
        }
    }
    out.push_str("featured_image:\n");
    let featured = input.local_image.unwrap_or(display);
    let _ = writeln!(out, "  src: \"{}\"", escape_quotes(featured));
    out.push_str("---\n\n");

    match input.local_image {
        Some(src) => {
            let _ = writeln!(out, "{{{{< figure src=\"{src}\" title=\"{title}\" >}}}}");
        }
        None => {
            let _ = writeln!(
                out,
                "{{{{< flickr-image url=\"{}\" title=\"{title}\" >}}}}",
                escape_quotes(display)
            );
        }
    }

    let description = record.description.trim();
    if !description.is_empty() {
        out.push('\n');
        out.push_str(description);
        out.push('\n');
    }
    out
}

/// Write `<dir>/<slug>.md`. With `dry_run` only the path is returned.
pub fn write_content(dir: &Path, slug: &str, body: &str, dry_run: bool) -> Result<PathBuf> {
    let path = dir.join(format!("{slug}.md"));
    if dry_run {
        tracing::info!(target: "flickr_sync::content", path = %path.display(), "dry run, not writing");
        return Ok(path);
    }
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(target: "flickr_sync::content", path = %path.display(), "wrote content file");
    Ok(path)
}

/// Create the content directory and its `_index.md` when missing.
pub fn ensure_index_file(dir: &Path) -> Result<bool> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(INDEX_FILE);
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, INDEX_BODY).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(target: "flickr_sync::content", path = %path.display(), "created section index");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(title: &str, id: Option<&str>) -> PhotoRecord {
        let ts = Utc.with_ymd_and_hms(2025, 3, 2, 18, 0, 0).unwrap();
        PhotoRecord {
            id: id.map(str::to_string),
            title: title.to_string(),
            link: String::new(),
            published_at: ts,
            taken_at: ts,
            description: String::new(),
            image_url: String::new(),
            author: "A".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn slug_without_id_has_no_suffix() {
        assert_eq!(slug_for(&record("Harbour", None)), "2025-03-02-harbour");
        assert_eq!(slug_for(&record("!!!", Some("42"))), "2025-03-02-untitled-42");
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(escape_quotes(r#"say "hi""#), r#"say \"hi\""#);
    }
}
