// tests/log_filter.rs
//
// The default filter must let the crate's own info events through.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flickr_sync::content::{ensure_index_file, write_content};
use flickr_sync::ingest::fetch::{with_retry, RetryPolicy};
use flickr_sync::DEFAULT_LOG_FILTER;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn default_subscriber(out: &Capture) -> impl tracing::Subscriber + Send + Sync {
    let writer = out.clone();
    tracing_subscriber::registry()
        .with(EnvFilter::new(DEFAULT_LOG_FILTER))
        .with(fmt::layer().with_ansi(false).with_writer(move || writer.clone()))
}

#[test]
fn content_events_pass_the_default_filter() {
    let out = Capture::default();
    let tmp = tempfile::tempdir().unwrap();

    tracing::subscriber::with_default(default_subscriber(&out), || {
        write_content(tmp.path(), "2025-03-02-harbour-at-dusk-1234", "body", true).unwrap();
        ensure_index_file(tmp.path()).unwrap();
        tracing::info!(target: "hyper::proto", "connection noise");
    });

    let text = out.text();
    assert!(text.contains("dry run, not writing"), "got:\n{text}");
    assert!(text.contains("2025-03-02-harbour-at-dusk-1234.md"), "got:\n{text}");
    assert!(text.contains("created section index"), "got:\n{text}");
    assert!(!text.contains("connection noise"), "got:\n{text}");
}

#[tokio::test]
async fn retry_notices_pass_the_default_filter() {
    let out = Capture::default();
    let _guard = tracing::subscriber::set_default(default_subscriber(&out));

    let policy = RetryPolicy::new(2, Duration::from_millis(1));
    let result: Result<u32, String> = with_retry(&policy, "feed", |attempt| async move {
        if attempt == 0 {
            Err("timed out".to_string())
        } else {
            Ok(attempt)
        }
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    let text = out.text();
    assert!(text.contains("request failed, retrying"), "got:\n{text}");
}
