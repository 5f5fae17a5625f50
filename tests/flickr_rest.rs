// tests/flickr_rest.rs
//
// Local axum stand-in for the Flickr REST endpoint, feed and static host.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flickr_sync::flickr::{Credentials, FlickrClient, FlickrError};
use flickr_sync::images::ImageDownloader;
use flickr_sync::ingest::fetch::RetryPolicy;
use flickr_sync::ingest::normalize::NormalizeCtx;
use flickr_sync::ingest::providers::feed::FeedProvider;
use flickr_sync::ingest::providers::fetch_with_fallback;
use flickr_sync::ingest::providers::rest_api::RestApiProvider;
use flickr_sync::ingest::types::{PhotoSource, SourceKind};
use flickr_sync::ingest::{run_once, Pacing, RunContext, RunOptions};

const RSS_XML: &str = include_str!("../data/flickr-sample.xml");

#[derive(Clone)]
struct Stub {
    addr: Arc<std::sync::OnceLock<SocketAddr>>,
    api_up: bool,
    api_hits: Arc<AtomicU32>,
}

async fn rest(State(stub): State<Stub>, Query(q): Query<HashMap<String, String>>) -> Response {
    stub.api_hits.fetch_add(1, Ordering::SeqCst);
    if !stub.api_up {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let addr = stub.addr.get().copied().expect("addr set");
    let method = q.get("method").map(String::as_str).unwrap_or_default();
    let body = match method {
        "flickr.people.getPhotos" => json!({
            "stat": "ok",
            "photos": {"page": 1, "photo": [{
                "id": "53585109999",
                "title": "Canal Bridge",
                "datetaken": "2025-02-10 09:15:00",
                "dateupload": "1739500000",
                "tags": "canal bridge sampleuser",
                "ownername": "sampleuser",
                "url_m": "https://live.staticflickr.com/65535/53585109999_abc_m.jpg",
                "description": {"_content": "Morning fog"}
            }]}
        }),
        "flickr.photos.getInfo" => json!({
            "stat": "ok",
            "photo": {
                "id": "53585109999",
                "title": {"_content": "Canal Bridge in Fog"},
                "description": {"_content": "Morning fog over the canal"},
                "dates": {"posted": "1739500000", "taken": "2025-02-10 09:15:00"},
                "tags": {"tag": [{"raw": "canal", "_content": "canal"}, {"raw": "SampleUser", "_content": "sampleuser"}]},
                "urls": {"url": [{"type": "photopage", "_content": "https://www.flickr.com/photos/sampleuser/53585109999/"}]},
                "owner": {"username": "sampleuser", "realname": "Sample User"}
            }
        }),
        "flickr.photos.getSizes" => json!({
            "stat": "ok",
            "sizes": {"size": [
                {"label": "Medium", "width": 500, "height": 333, "source": format!("http://{addr}/img/medium.jpg")},
                {"label": "Large", "width": "1024", "height": "683", "source": format!("http://{addr}/img/large.jpg")},
                {"label": "Large 1600", "width": 1600, "height": 1067, "source": format!("http://{addr}/img/1600.jpg")}
            ]}
        }),
        "flickr.photos.getExif" => json!({
            "stat": "ok",
            "photo": {"exif": [
                {"tag": "Model", "raw": {"_content": "X100V"}},
                {"tag": "FNumber", "raw": {"_content": "5.6"}}
            ]}
        }),
        _ => json!({"stat": "fail", "code": 112, "message": "Method not found"}),
    };
    Json(body).into_response()
}

async fn serve(api_up: bool) -> (SocketAddr, Arc<AtomicU32>) {
    let api_hits = Arc::new(AtomicU32::new(0));
    let stub = Stub {
        addr: Arc::new(std::sync::OnceLock::new()),
        api_up,
        api_hits: api_hits.clone(),
    };
    let app = Router::new()
        .route("/rest", get(rest))
        .route(
            "/feed",
            get(|| async { ([(header::CONTENT_TYPE, "application/rss+xml")], RSS_XML) }),
        )
        .route(
            "/img/{name}",
            get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], vec![0xFFu8, 0xD8, 0xFF]) }),
        )
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let _ = stub.addr.set(addr);
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    (addr, api_hits)
}

fn fast() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

fn client(addr: SocketAddr) -> FlickrClient {
    FlickrClient::new(reqwest::Client::new(), Credentials::new("test-key"))
        .with_base_url(format!("http://{addr}/rest"))
}

fn norm() -> NormalizeCtx {
    NormalizeCtx::new("sampleuser", "Fallback Author")
}

#[tokio::test]
async fn api_listing_maps_to_records() {
    let (addr, _) = serve(true).await;
    let provider = RestApiProvider::new(client(addr), "12345678@N00", norm()).with_retry(fast());
    let records = provider.fetch_latest(10).await.expect("listing ok");
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.id.as_deref(), Some("53585109999"));
    assert_eq!(r.title, "Canal Bridge");
    assert_eq!(r.link, "https://www.flickr.com/photos/12345678@N00/53585109999/");
    assert_eq!(r.tags, vec!["canal", "bridge"]);
    assert_eq!(r.taken_at.format("%Y-%m-%d %H:%M").to_string(), "2025-02-10 09:15");
    assert_eq!(r.published_at.timestamp(), 1_739_500_000);
}

#[tokio::test]
async fn stat_fail_is_a_typed_api_error() {
    let (addr, _) = serve(true).await;
    let err = client(addr)
        .call("flickr.nope", &[], false)
        .await
        .expect_err("unknown method fails");
    match err {
        FlickrError::Api { code, message } => {
            assert_eq!(code, 112);
            assert_eq!(message, "Method not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn api_outage_falls_back_to_feed() {
    let (addr, api_hits) = serve(false).await;
    let sources: Vec<Box<dyn PhotoSource>> = vec![
        Box::new(RestApiProvider::new(client(addr), "12345678@N00", norm()).with_retry(fast())),
        Box::new(
            FeedProvider::from_url(format!("http://{addr}/feed"), reqwest::Client::new(), norm())
                .with_retry(fast()),
        ),
    ];
    let batch = fetch_with_fallback(&sources, 50).await.expect("feed fallback");
    assert_eq!(batch.origin, SourceKind::Feed);
    assert_eq!(batch.records.len(), 2);
    assert_eq!(api_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn every_source_failing_is_an_error() {
    let (addr, _) = serve(false).await;
    let sources: Vec<Box<dyn PhotoSource>> = vec![
        Box::new(RestApiProvider::new(client(addr), "12345678@N00", norm()).with_retry(fast())),
        Box::new(
            FeedProvider::from_url(format!("http://{addr}/missing"), reqwest::Client::new(), norm())
                .with_retry(fast()),
        ),
    ];
    assert!(fetch_with_fallback(&sources, 50).await.is_err());
}

#[tokio::test]
async fn api_records_are_enriched_and_downloaded() {
    let (addr, _) = serve(true).await;
    let tmp = tempfile::tempdir().unwrap();
    let content = tmp.path().join("content/photos");
    let assets = tmp.path().join("static/images/photos");

    let api = client(addr);
    let sources: Vec<Box<dyn PhotoSource>> = vec![Box::new(
        RestApiProvider::new(api.clone(), "12345678@N00", norm()).with_retry(fast()),
    )];
    let batch = fetch_with_fallback(&sources, 50).await.unwrap();
    assert_eq!(batch.origin, SourceKind::RestApi);

    let ctx = RunContext {
        content_dir: content.clone(),
        options: RunOptions {
            download_images: true,
            ..RunOptions::default()
        },
        pacing: Pacing::none(),
        api: Some(api),
        downloader: ImageDownloader::new(reqwest::Client::new(), &assets).with_retry(fast()),
        owner_tag: "sampleuser".into(),
    };
    let summary = run_once(batch, &ctx).await.unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.images_downloaded, 1);
    assert!(assets.join("flickr-53585109999.jpg").exists());

    let body =
        std::fs::read_to_string(content.join("2025-02-10-canal-bridge-in-fog-9999.md")).unwrap();
    assert!(body.contains("title: \"Canal Bridge in Fog\""));
    assert!(body.contains("author: \"Sample User\""));
    assert!(body.contains("tags: [\"canal\"]"));
    assert!(body.contains(&format!("  image_url: \"http://{addr}/img/1600.jpg\"")));
    assert!(body.contains("  exif:\n    camera: \"X100V\"\n    aperture: \"5.6\"\n"));
    assert!(body.contains("  src: \"/images/photos/flickr-53585109999.jpg\""));
    assert!(body.contains(
        "{{< figure src=\"/images/photos/flickr-53585109999.jpg\" title=\"Canal Bridge in Fog\" >}}"
    ));
    assert!(body.trim_end().ends_with("Morning fog over the canal"));
}
