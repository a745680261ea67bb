//! HTTP download engine for streaming a single file to disk.
//!
//! This module provides everything needed to fetch one URL into one
//! destination file with progress reporting and clean failure semantics.
//!
//! # Features
//!
//! - Storage preflight (directory creation, stale file removal, free space)
//! - Advisory connectivity check
//! - Streaming transfer in fixed 8 KiB chunks with cooperative cancellation
//! - Time-throttled progress events (at most one byte count per 500 ms)
//! - No partial artifacts: failed or cancelled transfers delete their output
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use fetcher_core::download::{DownloadEngine, DownloadRequest, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(HttpClient::new());
//! let request = DownloadRequest::new("https://example.com/app.apk", "./app.apk")?;
//! let result = engine.start(request)?.wait().await;
//! println!("{}", if result.is_success() { "done" } else { "failed" });
//! # Ok(())
//! # }
//! ```

mod client;
pub mod connectivity;
mod constants;
mod engine;
mod error;
pub mod preflight;
pub mod progress;
mod request;
mod result;

pub use client::{HttpClient, body_reader};
pub use connectivity::{ConnectivityCheck, RouteProbe};
pub use constants::{CHUNK_SIZE, CONNECT_TIMEOUT_SECS, PROGRESS_INTERVAL};
pub use engine::{Canceller, DownloadEngine, DownloadState, TransferHandle};
pub use error::{DownloadError, FailureKind, StorageError};
pub use preflight::StoragePreflight;
pub use progress::{
    NoopReporter, Phase, ProgressEvent, ProgressReporter, ProgressThrottle, TracingReporter,
    TransferEvent,
};
pub use request::{DownloadRequest, normalize_address};
pub use result::{Outcome, TransferResult};
