// src/flickr/sizes.rs
use once_cell::sync::OnceCell;
use regex::Regex;

use super::types::SizeDescriptor;

const HIGH_QUALITY_LABELS: [&str; 4] = ["Original", "Large 2048", "Large 1600", "Large"];
const LOW_QUALITY_LABELS: [&str; 4] = ["Large", "Medium 800", "Medium 640", "Medium"];
const DISPLAY_LABELS: [&str; 2] = ["Large 1600", "Large"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    High,
    Low,
}

/// What to download and what to show when the download is not available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    pub download_url: String,
    pub display_url: String,
    pub label: Option<String>,
}

fn by_labels<'a>(sizes: &'a [SizeDescriptor], labels: &[&str]) -> Option<&'a SizeDescriptor> {
    labels
        .iter()
        .find_map(|label| sizes.iter().find(|s| s.label == *label))
}

fn by_area_desc(sizes: &[SizeDescriptor]) -> Vec<&SizeDescriptor> {
    let mut sorted: Vec<&SizeDescriptor> = sizes.iter().collect();
    sorted.sort_by(|a, b| b.area().cmp(&a.area()));
    sorted
}

/// Pick the size to download.
///
/// High quality walks `Original → Large 2048 → Large 1600 → Large`, then takes
/// the largest area. Low quality walks `Large → Medium 800 → Medium 640 → Medium`,
/// then takes the middle of the area-sorted list.
pub fn select_download_size(sizes: &[SizeDescriptor], quality: Quality) -> Option<&SizeDescriptor> {
    if sizes.is_empty() {
        return None;
    }
    match quality {
        Quality::High => by_labels(sizes, &HIGH_QUALITY_LABELS)
            .or_else(|| by_area_desc(sizes).first().copied()),
        Quality::Low => by_labels(sizes, &LOW_QUALITY_LABELS).or_else(|| {
            let sorted = by_area_desc(sizes);
            sorted.get(sorted.len() / 2).copied()
        }),
    }
}

/// Size referenced from the content file when pointing at Flickr directly.
pub fn select_display_size<'a>(
    sizes: &'a [SizeDescriptor],
    download: &'a SizeDescriptor,
) -> &'a SizeDescriptor {
    by_labels(sizes, &DISPLAY_LABELS).unwrap_or(download)
}

pub fn plan_from_sizes(sizes: &[SizeDescriptor], quality: Quality) -> Option<ImagePlan> {
    let download = select_download_size(sizes, quality)?;
    let display = select_display_size(sizes, download);
    Some(ImagePlan {
        download_url: download.source.clone(),
        display_url: display.source.clone(),
        label: Some(download.label.clone()),
    })
}

/// Long edge in pixels of the static URL size suffixes.
fn suffix_edge(letter: &str) -> Option<u32> {
    Some(match letter {
        "s" => 75,
        "t" => 100,
        "q" => 150,
        "m" => 240,
        "n" => 320,
        "w" => 400,
        "z" => 640,
        "c" => 800,
        "b" => 1024,
        _ => return None,
    })
}

/// Swap the size suffix of a static Flickr URL (`_m.jpg` → `_b.jpg` etc).
/// `_b` is 1024px on the long side, `_z` 640px. Suffixes already at or above
/// the target are left alone.
pub fn upgrade_static_url(url: &str, quality: Quality) -> String {
    static RE_SUFFIX: OnceCell<Regex> = OnceCell::new();
    let re = RE_SUFFIX.get_or_init(|| Regex::new(r"_([sqtmnwzcb])\.jpg$").unwrap());
    let target = match quality {
        Quality::High => "b",
        Quality::Low => "z",
    };
    let Some(caps) = re.captures(url) else {
        return url.to_string();
    };
    let (Some(current), Some(wanted)) = (suffix_edge(&caps[1]), suffix_edge(target)) else {
        return url.to_string();
    };
    if current >= wanted {
        return url.to_string();
    }
    re.replace(url, format!("_{target}.jpg")).into_owned()
}

/// Plan for records that only carry a feed thumbnail URL.
pub fn plan_from_feed_url(url: &str, quality: Quality) -> ImagePlan {
    let upgraded = upgrade_static_url(url, quality);
    ImagePlan {
        download_url: upgraded.clone(),
        display_url: upgraded,
        label: None,
    }
}
