// src/ingest/normalize.rs
//! Feed parsing and record extraction.
//!
//! Flickr serves the same photo list as RSS 2.0 or Atom, and the REST API
//! returns yet another JSON shape. Everything here funnels those into
//! [`PhotoRecord`]. Element names are matched on the full qualified name,
//! so `media:title` never lands in `title`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::flickr::types::{ListedPhoto, PhotoInfo};
use crate::ingest::types::PhotoRecord;

pub const UNTITLED: &str = "Untitled Photo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLink {
    pub rel: String,
    pub href: String,
}

/// An `<item>` or `<entry>` with the fields of both dialects side by side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub links: Vec<RawLink>,
    pub pub_date: Option<String>,
    pub published: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub creator: Option<String>,
    pub author_name: Option<String>,
    pub categories: Vec<String>,
    pub date_taken: Option<String>,
}

/// Per-run knobs for turning raw payloads into records.
#[derive(Debug, Clone)]
pub struct NormalizeCtx {
    /// The account's own username tag, never copied into `tags`.
    pub owner_tag: String,
    /// Used when the payload names no author.
    pub default_author: String,
    pub now: DateTime<Utc>,
}

impl NormalizeCtx {
    pub fn new(owner_tag: impl Into<String>, default_author: impl Into<String>) -> Self {
        Self {
            owner_tag: owner_tag.into(),
            default_author: default_author.into(),
            now: Utc::now(),
        }
    }
}

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Normalize caption text: decode entities, strip tags, fold whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    out = re(&RE_TAGS, r"(?is)</?[^>]+>")
        .replace_all(&out, "")
        .to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    out = re(&RE_WS, r"\s+").replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Filesystem-safe form of a title.
///
/// Lowercases, drops everything that is not an ASCII word character,
/// whitespace or `-`, collapses runs of whitespace/`_`/`-` into one `-`
/// and trims dashes from both ends.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    static RE_SEP: OnceCell<Regex> = OnceCell::new();
    re(&RE_SEP, r"[\s_-]+")
        .replace_all(&kept, "-")
        .trim_matches('-')
        .to_string()
}

/// Flickr page links look like `/photos/<owner>/<digits>/`.
pub fn extract_photo_id(link: &str) -> Option<String> {
    static RE_ID: OnceCell<Regex> = OnceCell::new();
    re(&RE_ID, r"/photos/[^/]+/([0-9]+)")
        .captures(link)
        .map(|c| c[1].to_string())
}

/// First `<img src="...">` in an HTML fragment.
pub fn extract_image_url(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    re(&RE_IMG, r#"(?i)<img\b[^>]*?\ssrc\s*=\s*"([^"]+)""#)
        .captures(html)
        .map(|c| html_escape::decode_html_entities(&c[1]).to_string())
}

/// `Taken on March 5, 2025` style hints embedded in feed HTML.
pub fn extract_taken_hint(html: &str) -> Option<String> {
    static RE_TAKEN: OnceCell<Regex> = OnceCell::new();
    re(&RE_TAKEN, r"(?i)taken on ([^<]+)")
        .captures(html)
        .map(|c| c[1].trim().to_string())
}

/// Caption paragraphs of a Flickr feed description, without the
/// "X posted a photo:" header and the image paragraph.
pub fn extract_caption(html: &str) -> String {
    static RE_IMG_TAG: OnceCell<Regex> = OnceCell::new();
    let img = re(&RE_IMG_TAG, r"(?i)<img\b");
    html.split("</p>")
        .filter(|p| !img.is_match(p) && !p.contains("posted a photo"))
        .map(normalize_text)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

pub fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
}

/// Best-effort parse of the date formats Flickr uses across feeds, pages and the API.
/// Naive values are taken as UTC.
pub fn parse_flexible_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim().trim_end_matches('.');
    if s.is_empty() {
        return None;
    }
    if let Some(dt) = parse_rfc3339(s).or_else(|| parse_rfc2822(s)) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(n.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
        }
    }
    None
}

// Flickr descriptions use HTML entities that are not defined in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

fn qname(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn is_entry(name: &str) -> bool {
    name == "item" || name == "entry"
}

fn root_format(name: &str) -> Result<FeedFormat> {
    match name {
        "rss" => Ok(FeedFormat::Rss),
        "feed" => Ok(FeedFormat::Atom),
        other => bail!("unrecognised feed root element <{other}>"),
    }
}

impl RawEntry {
    fn take_attributes(&mut self, name: &str, e: &BytesStart) {
        match name {
            "link" => {
                if let Some(href) = attr(e, "href") {
                    let rel = attr(e, "rel").unwrap_or_else(|| "alternate".to_string());
                    self.links.push(RawLink { rel, href });
                }
            }
            "category" => {
                if let Some(term) = attr(e, "term") {
                    self.categories.push(term);
                }
            }
            _ => {}
        }
    }

    fn assign(&mut self, name: &str, depth: usize, parent: Option<&str>, value: String) {
        if value.is_empty() {
            return;
        }
        match (depth, name) {
            (1, "title") => self.title = Some(value),
            (1, "link") => self.link = Some(value),
            (1, "pubDate") => self.pub_date = Some(value),
            (1, "published") => self.published = Some(value),
            (1, "description") => self.description = Some(value),
            (1, "content") => self.content = Some(value),
            (1, "dc:creator") => self.creator = Some(value),
            (1, "category") => self.categories.push(value),
            (1, "media:category") => self
                .categories
                .extend(value.split_whitespace().map(str::to_string)),
            (1, "dc:date.Taken") | (1, "flickr:date_taken") => self.date_taken = Some(value),
            (2, "name") if parent == Some("author") => self.author_name = Some(value),
            _ => {}
        }
    }
}

/// Sniff the dialect from the root element.
pub fn detect_format(xml: &str) -> Result<FeedFormat> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event().context("reading feed root")? {
            Event::Start(e) | Event::Empty(e) => return root_format(&qname(&e)),
            Event::Eof => bail!("empty feed document"),
            _ => {}
        }
    }
}

/// Parse an RSS or Atom document into raw entries.
pub fn parse_feed(xml: &str) -> Result<(FeedFormat, Vec<RawEntry>)> {
    let cleaned = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&cleaned);
    reader.config_mut().trim_text(true);

    let mut format: Option<FeedFormat> = None;
    let mut entries = Vec::new();
    let mut current: Option<RawEntry> = None;
    // element names below the current entry
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event().context("parsing feed xml")? {
            Event::Start(e) => {
                let name = qname(&e);
                if format.is_none() {
                    format = Some(root_format(&name)?);
                    continue;
                }
                if current.is_none() {
                    if is_entry(&name) {
                        current = Some(RawEntry::default());
                        path.clear();
                    }
                    continue;
                }
                if let Some(entry) = current.as_mut() {
                    if path.is_empty() {
                        entry.take_attributes(&name, &e);
                    }
                }
                path.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                let name = qname(&e);
                if format.is_none() {
                    format = Some(root_format(&name)?);
                    continue;
                }
                if let Some(entry) = current.as_mut() {
                    if path.is_empty() {
                        entry.take_attributes(&name, &e);
                    }
                }
            }
            Event::Text(t) => {
                if current.is_some() && !path.is_empty() {
                    text.push_str(&t.unescape().context("unescaping feed text")?);
                }
            }
            Event::CData(c) => {
                if current.is_some() && !path.is_empty() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                if current.is_none() {
                    continue;
                }
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if path.is_empty() {
                    if is_entry(&name) {
                        if let Some(done) = current.take() {
                            entries.push(done);
                        }
                    }
                    continue;
                }
                let depth = path.len();
                path.pop();
                let value = std::mem::take(&mut text).trim().to_string();
                if let Some(entry) = current.as_mut() {
                    entry.assign(&name, depth, path.last().map(String::as_str), value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match format {
        Some(f) => Ok((f, entries)),
        None => bail!("empty feed document"),
    }
}

fn clean_title(raw: Option<&str>) -> String {
    let t = normalize_text(raw.unwrap_or_default());
    if t.is_empty() {
        UNTITLED.to_string()
    } else {
        t
    }
}

fn resolve_taken(structured: Option<&str>, html: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(dt) = structured.and_then(parse_flexible_date) {
        return dt;
    }
    if let Some(hint) = extract_taken_hint(html) {
        match parse_flexible_date(&hint) {
            Some(dt) => return dt,
            None => tracing::debug!(hint = %hint, "unparsable taken date, using publish date"),
        }
    }
    fallback
}

/// Map one raw entry to a record, choosing RSS or Atom rules by which date field is present.
pub fn to_record(raw: &RawEntry, ctx: &NormalizeCtx) -> PhotoRecord {
    let (link, published_at, html, author) = if let Some(pub_date) = raw.pub_date.as_deref() {
        (
            raw.link.clone().unwrap_or_default(),
            parse_rfc2822(pub_date).unwrap_or(ctx.now),
            raw.description.clone().unwrap_or_default(),
            raw.creator.clone(),
        )
    } else if let Some(published) = raw.published.as_deref() {
        let link = raw
            .links
            .iter()
            .find(|l| l.rel == "alternate")
            .or_else(|| raw.links.first())
            .map(|l| l.href.clone())
            .unwrap_or_default();
        (
            link,
            parse_rfc3339(published)
                .or_else(|| parse_flexible_date(published))
                .unwrap_or(ctx.now),
            raw.content.clone().unwrap_or_default(),
            raw.author_name.clone(),
        )
    } else {
        let mut record = PhotoRecord {
            id: None,
            title: UNTITLED.to_string(),
            link: String::new(),
            published_at: ctx.now,
            taken_at: ctx.now,
            description: String::new(),
            image_url: String::new(),
            author: ctx.default_author.clone(),
            tags: Vec::new(),
        };
        for c in &raw.categories {
            record.add_tag(c, &ctx.owner_tag);
        }
        return record;
    };

    let mut record = PhotoRecord {
        id: extract_photo_id(&link),
        title: clean_title(raw.title.as_deref()),
        link,
        published_at,
        taken_at: resolve_taken(raw.date_taken.as_deref(), &html, published_at),
        description: extract_caption(&html),
        image_url: extract_image_url(&html).unwrap_or_default(),
        author: author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| ctx.default_author.clone()),
        tags: Vec::new(),
    };
    for c in &raw.categories {
        record.add_tag(c, &ctx.owner_tag);
    }
    record
}

/// Parse a feed document straight into records.
pub fn records_from_feed(xml: &str, ctx: &NormalizeCtx) -> Result<Vec<PhotoRecord>> {
    let (format, entries) = parse_feed(xml)?;
    tracing::debug!(target: "flickr_sync::normalize", ?format, entries = entries.len(), "parsed feed");
    Ok(entries.iter().map(|e| to_record(e, ctx)).collect())
}

pub fn photo_page_url(user_id: &str, photo_id: &str) -> String {
    format!("https://www.flickr.com/photos/{user_id}/{photo_id}/")
}

/// Map a `flickr.people.getPhotos` entry (with extras) to a record.
pub fn record_from_listing(photo: &ListedPhoto, user_id: &str, ctx: &NormalizeCtx) -> PhotoRecord {
    let published_at = photo
        .dateupload
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .unwrap_or(ctx.now);
    let taken_at = photo
        .datetaken
        .as_deref()
        .and_then(parse_flexible_date)
        .unwrap_or(published_at);
    let mut record = PhotoRecord {
        id: Some(photo.id.clone()),
        title: clean_title(Some(&photo.title)),
        link: photo_page_url(user_id, &photo.id),
        published_at,
        taken_at,
        description: photo
            .description
            .as_ref()
            .map(|d| d.content.clone())
            .unwrap_or_default(),
        image_url: photo.url_m.clone().unwrap_or_default(),
        author: photo
            .ownername
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| ctx.default_author.clone()),
        tags: Vec::new(),
    };
    for t in photo.tags.split_whitespace() {
        record.add_tag(t, &ctx.owner_tag);
    }
    record
}

/// Overlay the richer `flickr.photos.getInfo` fields onto a record.
pub fn apply_photo_info(record: &mut PhotoRecord, info: &PhotoInfo, owner_tag: &str) {
    let title = normalize_text(&info.title.content);
    if !title.is_empty() {
        record.title = title;
    }
    if !info.description.content.trim().is_empty() {
        record.description = info.description.content.trim().to_string();
    }
    if let Some(posted) = DateTime::from_timestamp(info.dates.posted, 0).filter(|_| info.dates.posted > 0) {
        record.published_at = posted;
    }
    if let Some(taken) = info.dates.taken.as_deref().and_then(parse_flexible_date) {
        record.taken_at = taken;
    }
    if !info.tags.tag.is_empty() {
        record.tags.clear();
        for t in &info.tags.tag {
            let raw = if t.raw.trim().is_empty() { &t.content } else { &t.raw };
            record.add_tag(raw, owner_tag);
        }
    }
    if let Some(page) = info.urls.url.iter().find(|u| u.kind == "photopage") {
        record.link = page.content.clone();
    }
    if let Some(name) = info
        .owner
        .realname
        .as_deref()
        .or(info.owner.username.as_deref())
        .filter(|n| !n.trim().is_empty())
    {
        record.author = name.trim().to_string();
    }
}
