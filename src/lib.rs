// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod content;
pub mod dedup;
pub mod flickr;
pub mod images;
pub mod ingest;
pub mod metrics;

/// Log filter used when `RUST_LOG` is unset. Every event target lives under
/// `flickr_sync::`, so this keeps the crate at info and everything else at warn.
pub const DEFAULT_LOG_FILTER: &str = "flickr_sync=info,warn";

// ---- Re-exports for stable public API ----
pub use crate::config::Settings;
pub use crate::ingest::types::{PhotoRecord, PhotoSource, SourceKind};
pub use crate::ingest::{run_once, run_sync, RunSummary, SyncFlags};
