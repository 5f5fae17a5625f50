// tests/content_render.rs
use chrono::{TimeZone, Utc};
use flickr_sync::content::{ensure_index_file, render_content, write_content, RenderInput};
use flickr_sync::flickr::types::ExifSummary;
use flickr_sync::ingest::types::PhotoRecord;

fn record() -> PhotoRecord {
    PhotoRecord {
        id: Some("53585101234".into()),
        title: "Test Photo & \"Quotes\"".into(),
        link: "https://www.flickr.com/photos/sampleuser/53585101234/".into(),
        published_at: Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap(),
        taken_at: Utc.with_ymd_and_hms(2025, 3, 2, 18, 10, 0).unwrap(),
        description: "Fishing boats coming in".into(),
        image_url: "https://live.staticflickr.com/65535/53585101234_0a1b2c3d4e_m.jpg".into(),
        author: "Sample User".into(),
        tags: vec!["harbour".into(), "boats".into()],
    }
}

#[test]
fn local_image_renders_figure_and_exact_front_matter() {
    let exif = ExifSummary {
        entries: vec![("camera".into(), "X100V".into()), ("iso".into(), "200".into())],
    };
    let out = render_content(
        &record(),
        &RenderInput {
            display_url: "https://live.staticflickr.com/65535/53585101234_0a1b2c3d4e_b.jpg",
            local_image: Some("/images/photos/flickr-53585101234.jpg"),
            exif: Some(&exif),
        },
    );
    let expected = "---\n\
title: \"Test Photo & \\\"Quotes\\\"\"\n\
date: 2025-03-02T18:10:00+00:00\n\
description: \"Photo: Test Photo & \\\"Quotes\\\"\"\n\
author: \"Sample User\"\n\
type: \"photos\"\n\
tags: [\"harbour\", \"boats\"]\n\
flickr:\n  \
url: \"https://www.flickr.com/photos/sampleuser/53585101234/\"\n  \
photo_id: \"53585101234\"\n  \
image_url: \"https://live.staticflickr.com/65535/53585101234_0a1b2c3d4e_b.jpg\"\n  \
date_taken: \"2025-03-02T18:10:00+00:00\"\n  \
date_published: \"2025-03-05T12:00:00+00:00\"\n  \
exif:\n    \
camera: \"X100V\"\n    \
iso: \"200\"\n\
featured_image:\n  \
src: \"/images/photos/flickr-53585101234.jpg\"\n\
---\n\
\n\
{{< figure src=\"/images/photos/flickr-53585101234.jpg\" title=\"Test Photo & \\\"Quotes\\\"\" >}}\n\
\n\
Fishing boats coming in\n";
    assert_eq!(out, expected);
}

#[test]
fn remote_image_uses_flickr_shortcode_and_omits_empty_exif() {
    let mut r = record();
    r.description.clear();
    r.id = None;
    let out = render_content(
        &r,
        &RenderInput {
            display_url: "https://live.staticflickr.com/x_b.jpg",
            local_image: None,
            exif: Some(&ExifSummary::default()),
        },
    );
    assert!(out.contains("  photo_id: \"\"\n"));
    assert!(!out.contains("exif:"));
    assert!(out.contains("  src: \"https://live.staticflickr.com/x_b.jpg\"\n"));
    assert!(out.ends_with(
        "{{< flickr-image url=\"https://live.staticflickr.com/x_b.jpg\" title=\"Test Photo & \\\"Quotes\\\"\" >}}\n"
    ));
}

#[test]
fn index_file_is_created_once() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("content/photos");
    assert!(ensure_index_file(&dir).unwrap());
    assert_eq!(
        std::fs::read_to_string(dir.join("_index.md")).unwrap(),
        "---\ntitle: \"Photos\"\ndescription: \"Photos I've taken and shared on Flickr.\"\nurl: /photos/\n---\n"
    );
    std::fs::write(dir.join("_index.md"), "custom").unwrap();
    assert!(!ensure_index_file(&dir).unwrap());
    assert_eq!(std::fs::read_to_string(dir.join("_index.md")).unwrap(), "custom");
}

#[test]
fn dry_run_write_returns_path_only() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_content(tmp.path(), "2025-03-02-x-1234", "body", true).unwrap();
    assert_eq!(path, tmp.path().join("2025-03-02-x-1234.md"));
    assert!(!path.exists());

    let path = write_content(tmp.path(), "2025-03-02-x-1234", "body", false).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "body");
}
