//! Response shapes of the Flickr REST API (`format=json&nojsoncallback=1`).
//!
//! Flickr is loose with numbers: the same field arrives as `75` or `"75"`
//! depending on the method, so numeric fields go through lenient helpers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn lenient_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn de_lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(lenient_i64(&Value::deserialize(d)?).unwrap_or(0))
}

fn de_lenient_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(lenient_i64(&Value::deserialize(d)?))
}

fn de_lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(lenient_i64(&Value::deserialize(d)?)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0))
}

/// `{"_content": "..."}` wrapper used all over the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    #[serde(rename = "_content", default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotosResponse {
    pub photos: PhotoList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoList {
    #[serde(default)]
    pub photo: Vec<ListedPhoto>,
}

/// Entry of `flickr.people.getPhotos` with the extras we request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListedPhoto {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub datetaken: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_opt_i64")]
    pub dateupload: Option<i64>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub ownername: Option<String>,
    #[serde(default)]
    pub url_m: Option<String>,
    #[serde(default)]
    pub description: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoInfoResponse {
    pub photo: PhotoInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoInfo {
    pub id: String,
    #[serde(default)]
    pub title: Content,
    #[serde(default)]
    pub description: Content,
    #[serde(default)]
    pub dates: Dates,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub urls: Urls,
    #[serde(default)]
    pub owner: Owner,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dates {
    /// Unix seconds, sent as a string.
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub posted: i64,
    #[serde(default)]
    pub taken: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub tag: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub raw: String,
    #[serde(rename = "_content", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Urls {
    #[serde(default)]
    pub url: Vec<UrlEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "_content", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizesResponse {
    pub sizes: SizeList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SizeList {
    #[serde(default)]
    pub size: Vec<SizeDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeDescriptor {
    pub label: String,
    #[serde(default, deserialize_with = "de_lenient_u32")]
    pub width: u32,
    #[serde(default, deserialize_with = "de_lenient_u32")]
    pub height: u32,
    pub source: String,
}

impl SizeDescriptor {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExifResponse {
    pub photo: ExifPhoto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExifPhoto {
    #[serde(default)]
    pub exif: Vec<ExifTag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExifTag {
    pub tag: String,
    #[serde(default)]
    pub raw: Content,
}

/// Camera fields surfaced in front matter, in output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifSummary {
    pub entries: Vec<(String, String)>,
}

impl ExifSummary {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_tags(tags: &[ExifTag]) -> Self {
        const WANTED: [(&str, &str); 5] = [
            ("Model", "camera"),
            ("ExposureTime", "exposureTime"),
            ("FNumber", "aperture"),
            ("FocalLength", "focalLength"),
            ("ISO", "iso"),
        ];
        let entries = WANTED
            .iter()
            .filter_map(|(tag, key)| {
                tags.iter()
                    .find(|t| t.tag == *tag)
                    .map(|t| t.raw.content.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_string(), v))
            })
            .collect();
        Self { entries }
    }
}
