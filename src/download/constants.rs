//! Constants for the download module (timeouts, chunking, progress throttle).

use std::time::Duration;

/// Default HTTP connect timeout (15 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Size of one read/write step; cancellation is polled once per chunk.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Minimum wall-clock spacing between byte-count progress events.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
