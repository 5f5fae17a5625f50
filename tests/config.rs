// tests/config.rs
use flickr_sync::config::file::{load_file_config, ENV_CONFIG_PATH};
use flickr_sync::config::Settings;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

const ENV_KEYS: [&str; 7] = [
    ENV_CONFIG_PATH,
    "FLICKR_USER_ID",
    "FLICKR_API_KEY",
    "FLICKR_API_SECRET",
    "FLICKR_OAUTH_TOKEN",
    "FLICKR_OAUTH_TOKEN_SECRET",
    "PHOTO_LIMIT",
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[test]
fn toml_file_fills_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("flickr_sync.toml");
    fs::write(
        &p,
        r#"
user_id = "12345678@N00"
limit = 12
content_dir = "site/content/photos"
owner_tag = "sampleuser"
author = "Sample User"
low_quality = true

[pacing]
item_delay_ms = 250
batch_size = 4
batch_delay_ms = 2000

[retry]
max_attempts = 5
"#,
    )
    .unwrap();

    let mut s = Settings::default();
    s.apply_file(load_file_config(&p).unwrap());
    assert_eq!(s.user_id.as_deref(), Some("12345678@N00"));
    assert_eq!(s.limit, 12);
    assert_eq!(s.content_dir, PathBuf::from("site/content/photos"));
    assert_eq!(s.owner_tag, "sampleuser");
    assert_eq!(s.author, "Sample User");
    assert!(s.low_quality);
    assert_eq!(s.pacing.item_delay, Duration::from_millis(250));
    assert_eq!(s.pacing.batch_size, 4);
    assert_eq!(s.pacing.batch_delay, Duration::from_secs(2));
    assert_eq!(s.retry.max_attempts, 5);
    assert_eq!(s.retry.base_delay, Duration::from_secs(1));
}

#[serial_test::serial]
#[test]
fn layered_load_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing anywhere: defaults
    let s = Settings::load(None).unwrap();
    assert_eq!(s, Settings::default());

    // 2) Fallback TOML in ./config/
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(tmp.path().join("config/flickr_sync.toml"), "limit = 7\n").unwrap();
    assert_eq!(Settings::load(None).unwrap().limit, 7);

    // 3) Env config path wins over the fallback file
    let p_env = tmp.path().join("other.json");
    fs::write(&p_env, r#"{"limit": 9}"#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(Settings::load(None).unwrap().limit, 9);

    // 4) Env values win over the file
    env::set_var("PHOTO_LIMIT", "3");
    env::set_var("FLICKR_API_KEY", "abc");
    let s = Settings::load(None).unwrap();
    assert_eq!(s.limit, 3);
    assert!(s.has_api_key());

    // 5) Missing env config path is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
    assert!(Settings::load(None).is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}
