//! Download engine: one background transfer at a time.
//!
//! This module provides the [`DownloadEngine`], which runs a single transfer
//! on its own Tokio task and hands the caller a [`TransferHandle`] for
//! observing progress, cancelling, and collecting the terminal result.
//!
//! # Overview
//!
//! ```text
//! Idle -> Preflighting -> Connecting -> Transferring -> Succeeded
//!              |              |              |  \
//!              v              v              v   Cancelling
//!           Failed         Failed         Failed <-'
//! ```
//!
//! Events travel over a channel to whoever drives the handle, so progress
//! callbacks and the completion callback run in order on the caller's task
//! and never overlap.
//!
//! # Example
//!
//! ```no_run
//! use fetcher_core::download::{DownloadEngine, DownloadRequest, HttpClient, TracingReporter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(HttpClient::new());
//! let request = DownloadRequest::new("https://example.com/app.apk", "./downloads/app.apk")?;
//! let handle = engine.start(request)?;
//! let result = handle.run(&mut TracingReporter).await;
//! println!("success: {}", result.is_success());
//! # Ok(())
//! # }
//! ```

mod transfer;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::constants::{CHUNK_SIZE, PROGRESS_INTERVAL};
use super::error::DownloadError;
use super::preflight::StoragePreflight;
use super::progress::{ProgressReporter, ProgressThrottle, TransferEvent};
use super::request::DownloadRequest;
use super::result::TransferResult;
use super::HttpClient;
use transfer::TransferContext;

/// Lifecycle state of the engine's current transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Nothing running; ready for `start`.
    Idle,
    /// Checking the destination.
    Preflighting,
    /// Waiting for the response head.
    Connecting,
    /// Copying the body to disk.
    Transferring,
    /// Cancellation observed, cleaning up.
    Cancelling,
    /// Last transfer finished with a complete file.
    Succeeded,
    /// Last transfer failed or was cancelled.
    Failed,
}

impl DownloadState {
    /// Stable label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preflighting => "preflighting",
            Self::Connecting => "connecting",
            Self::Transferring => "transferring",
            Self::Cancelling => "cancelling",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Runs single-file transfers, at most one at a time.
///
/// The engine is cheap to share by reference; it holds only the client,
/// the preflight configuration and the in-flight flag.
#[derive(Debug)]
pub struct DownloadEngine {
    client: HttpClient,
    preflight: StoragePreflight,
    progress_interval: Duration,
    chunk_size: usize,
    active: Arc<AtomicBool>,
    state: Arc<watch::Sender<DownloadState>>,
}

impl DownloadEngine {
    /// Creates an engine using `client` for connections.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        let (state, _) = watch::channel(DownloadState::Idle);
        Self {
            client,
            preflight: StoragePreflight::new(),
            progress_interval: PROGRESS_INTERVAL,
            chunk_size: CHUNK_SIZE,
            active: Arc::new(AtomicBool::new(false)),
            state: Arc::new(state),
        }
    }

    /// Replaces the storage preflight (e.g. to simulate exhaustion).
    #[must_use]
    pub fn with_preflight(mut self, preflight: StoragePreflight) -> Self {
        self.preflight = preflight;
        self
    }

    /// Overrides the minimum spacing of byte-count progress events.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Current state of the engine.
    #[must_use]
    pub fn state(&self) -> DownloadState {
        *self.state.borrow()
    }

    /// Returns whether a transfer is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Starts a transfer in the background and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ConcurrentTransfer`] if a transfer is already
    /// active; the running transfer is left untouched.
    #[instrument(skip(self, request), fields(url = %request.source_url(), path = %request.destination().display()))]
    pub fn start(&self, request: DownloadRequest) -> Result<TransferHandle, DownloadError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("rejecting start while a transfer is active");
            return Err(DownloadError::ConcurrentTransfer);
        }
        let guard = ActiveGuard {
            active: Arc::clone(&self.active),
            state: Arc::clone(&self.state),
        };

        info!("starting transfer");
        let destination = request.destination().to_path_buf();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let state_rx = self.state.subscribe();

        let context = TransferContext {
            request,
            client: self.client.clone(),
            preflight: self.preflight,
            throttle: ProgressThrottle::new(self.progress_interval),
            chunk_size: self.chunk_size,
            cancel: cancel.clone(),
            state: Arc::clone(&self.state),
            events: events_tx.clone(),
        };

        let task = tokio::spawn(async move {
            let result = context.run().await;
            // Free the engine before the consumer hears about completion.
            guard.release();
            let _ = events_tx.send(TransferEvent::Complete(result));
        });

        Ok(TransferHandle {
            destination,
            events: events_rx,
            cancel,
            state: state_rx,
            task,
            finished: false,
        })
    }
}

/// Clears the in-flight flag when the task ends, including by panic.
struct ActiveGuard {
    active: Arc<AtomicBool>,
    state: Arc<watch::Sender<DownloadState>>,
}

impl ActiveGuard {
    fn release(self) {
        drop(self);
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if !self.state.borrow().is_terminal() {
            self.state.send_replace(DownloadState::Failed);
        }
        self.active.store(false, Ordering::Release);
    }
}

/// Cloneable cancellation trigger, usable from any thread.
#[derive(Debug, Clone)]
pub struct Canceller(CancellationToken);

impl Canceller {
    /// Requests cooperative cancellation.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Caller-side view of one running transfer.
#[derive(Debug)]
pub struct TransferHandle {
    destination: PathBuf,
    events: mpsc::UnboundedReceiver<TransferEvent>,
    cancel: CancellationToken,
    state: watch::Receiver<DownloadState>,
    task: JoinHandle<()>,
    finished: bool,
}

impl TransferHandle {
    /// Requests cancellation; a pending connect or read is abandoned at once.
    pub fn cancel(&self) {
        debug!("cancel requested");
        self.cancel.cancel();
    }

    /// Returns a cancellation trigger that outlives borrows of the handle.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        Canceller(self.cancel.clone())
    }

    /// Destination of this transfer.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// State of the transfer as last published by the task.
    #[must_use]
    pub fn state(&self) -> DownloadState {
        *self.state.borrow()
    }

    /// Next event in delivery order; `None` after the terminal result.
    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv().await {
            Some(event) => {
                if matches!(event, TransferEvent::Complete(_)) {
                    self.finished = true;
                }
                Some(event)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Delivers every event to `reporter` on the current task and returns
    /// the terminal result.
    pub async fn run<R: ProgressReporter + ?Sized>(mut self, reporter: &mut R) -> TransferResult {
        while let Some(event) = self.next_event().await {
            match event {
                TransferEvent::Progress(progress) => reporter.on_progress(&progress),
                TransferEvent::Complete(result) => {
                    reporter.on_complete(&result);
                    return result;
                }
            }
        }
        let result = self.lost_result().await;
        reporter.on_complete(&result);
        result
    }

    /// Waits for the terminal result, discarding progress.
    pub async fn wait(self) -> TransferResult {
        self.run(&mut super::progress::NoopReporter).await
    }

    /// The channel closed without a result: the task died.
    async fn lost_result(mut self) -> TransferResult {
        let reason = match (&mut self.task).await {
            Err(error) if error.is_panic() => "transfer task panicked",
            Err(_) => "transfer task was aborted",
            Ok(()) => "transfer task ended without a result",
        };
        warn!(reason, "no terminal result received");
        TransferResult::lost(&self.destination, reason)
    }
}
