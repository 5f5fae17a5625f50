// tests/cleanup_duplicates.rs
use flickr_sync::dedup::remove_duplicates;
use std::fs;
use std::path::Path;

fn photo(dir: &Path, name: &str, id: &str) {
    fs::write(
        dir.join(name),
        format!("---\ntitle: \"t\"\nflickr:\n  photo_id: \"{id}\"\n---\n"),
    )
    .unwrap();
}

fn remaining(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

#[test]
fn keeps_earliest_dated_file_per_photo_id() {
    let tmp = tempfile::tempdir().unwrap();
    let d = tmp.path();
    photo(d, "2025-03-05-harbour-at-dusk-1234.md", "53585101234");
    photo(d, "2025-03-02-harbour-at-dusk-1234.md", "53585101234");
    photo(d, "2025-03-03-renamed-1234.md", "53585101234");
    photo(d, "2025-03-01-test-photo-5678.md", "53585105678");
    fs::write(d.join("_index.md"), "---\ntitle: \"Photos\"\n---\n").unwrap();

    let mut removed = remove_duplicates(d, false).unwrap();
    removed.sort();
    assert_eq!(
        removed,
        vec![
            "2025-03-03-renamed-1234.md",
            "2025-03-05-harbour-at-dusk-1234.md",
        ]
    );
    assert_eq!(
        remaining(d),
        vec![
            "2025-03-01-test-photo-5678.md",
            "2025-03-02-harbour-at-dusk-1234.md",
            "_index.md",
        ]
    );
}

#[test]
fn files_without_ids_group_by_name_after_date() {
    let tmp = tempfile::tempdir().unwrap();
    let d = tmp.path();
    fs::write(d.join("2024-12-31-sunset.md"), "no front matter").unwrap();
    fs::write(d.join("2025-01-02-sunset.md"), "no front matter").unwrap();
    fs::write(d.join("notes.md"), "not a photo").unwrap();

    let removed = remove_duplicates(d, false).unwrap();
    assert_eq!(removed, vec!["2025-01-02-sunset.md"]);
    assert!(d.join("2024-12-31-sunset.md").exists());
    assert!(d.join("notes.md").exists());
}

#[test]
fn dry_run_reports_without_deleting() {
    let tmp = tempfile::tempdir().unwrap();
    let d = tmp.path();
    photo(d, "2025-03-05-a-1234.md", "1234");
    photo(d, "2025-03-02-b-1234.md", "1234");

    let removed = remove_duplicates(d, true).unwrap();
    assert_eq!(removed, vec!["2025-03-05-a-1234.md"]);
    assert_eq!(remaining(d).len(), 2);
}
