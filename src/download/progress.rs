//! Progress events, the time-based throttle, and the reporter sink.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::result::TransferResult;

/// Stage of a transfer as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// About to connect.
    Opening,
    /// Response head received.
    Connected,
    /// Bytes are flowing.
    Transferring,
    /// All bytes written, output being closed.
    Saving,
    /// Output closed.
    Complete,
}

impl Phase {
    /// Stable label used in logs and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Connected => "connected",
            Self::Transferring => "transferring",
            Self::Saving => "saving",
            Self::Complete => "complete",
        }
    }
}

/// One progress notification. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Current phase.
    pub phase: Phase,
    /// Cumulative bytes written so far.
    pub bytes_so_far: u64,
    /// HTTP status once known.
    pub response_code: Option<u16>,
}

/// Everything a transfer task delivers to its consumer, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A progress notification.
    Progress(ProgressEvent),
    /// The terminal result; always the last event.
    Complete(TransferResult),
}

/// Receives progress and the terminal result on the consumer's task.
///
/// Calls are strictly sequential: `on_complete` is called exactly once, after
/// every `on_progress`.
pub trait ProgressReporter {
    /// Called for each delivered progress event.
    fn on_progress(&mut self, event: &ProgressEvent);

    /// Called once with the terminal result.
    fn on_complete(&mut self, result: &TransferResult);
}

/// Reporter that writes events to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_progress(&mut self, event: &ProgressEvent) {
        info!(
            phase = event.phase.as_str(),
            kib = event.bytes_so_far / 1024,
            response_code = event.response_code,
            "progress"
        );
    }

    fn on_complete(&mut self, result: &TransferResult) {
        if result.is_success() {
            info!(
                path = %result.destination.display(),
                bytes = result.bytes_transferred,
                "transfer succeeded"
            );
        } else {
            warn!(summary = %result.summary(), "transfer failed");
        }
    }
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_progress(&mut self, _event: &ProgressEvent) {}

    fn on_complete(&mut self, _result: &TransferResult) {}
}

/// Wall-clock throttle for byte-count events.
///
/// The first call always passes; afterwards a call passes only once
/// `interval` has elapsed since the last passing call.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    next_at: Option<Instant>,
}

impl ProgressThrottle {
    /// Creates a throttle with the given minimum spacing.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_at: None,
        }
    }

    /// Returns whether an event may be emitted at `now`, and if so arms the
    /// next window.
    pub fn ready_at(&mut self, now: Instant) -> bool {
        if self.next_at.is_some_and(|next| now < next) {
            return false;
        }
        self.next_at = Some(now + self.interval);
        true
    }

    /// [`ready_at`](Self::ready_at) with the current time.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }
}
