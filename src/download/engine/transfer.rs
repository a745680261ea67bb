//! The body of one transfer: preflight, connect, chunked copy, close.
//!
//! Runs on the engine's background task. Every path ends in exactly one
//! [`TransferResult`]; errors never escape as task failures.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::DownloadState;
use crate::download::client::{HttpClient, body_reader};
use crate::download::error::DownloadError;
use crate::download::preflight::StoragePreflight;
use crate::download::progress::{Phase, ProgressEvent, ProgressThrottle, TransferEvent};
use crate::download::request::DownloadRequest;
use crate::download::result::TransferResult;

/// Everything the background task needs; owned by the task.
pub(super) struct TransferContext {
    pub(super) request: DownloadRequest,
    pub(super) client: HttpClient,
    pub(super) preflight: StoragePreflight,
    pub(super) throttle: ProgressThrottle,
    pub(super) chunk_size: usize,
    pub(super) cancel: CancellationToken,
    pub(super) state: Arc<watch::Sender<DownloadState>>,
    pub(super) events: mpsc::UnboundedSender<TransferEvent>,
}

/// What is known about the transfer so far, kept for the failure report.
#[derive(Debug, Default)]
struct Tally {
    response_code: Option<u16>,
    bytes: u64,
    output_created: bool,
}

impl TransferContext {
    fn set_state(&self, state: DownloadState) {
        debug!(state = state.as_str(), "transfer state");
        self.state.send_replace(state);
    }

    fn emit(&self, phase: Phase, bytes_so_far: u64, response_code: Option<u16>) {
        // A dropped receiver only means nobody is watching.
        let _ = self.events.send(TransferEvent::Progress(ProgressEvent {
            phase,
            bytes_so_far,
            response_code,
        }));
    }

    /// Runs the transfer to its terminal result.
    #[instrument(skip(self), fields(url = %self.request.source_url(), path = %self.request.destination().display()))]
    pub(super) async fn run(mut self) -> TransferResult {
        let mut tally = Tally::default();
        let outcome = self.execute(&mut tally).await;
        let destination = self.request.destination();

        match outcome {
            Ok(()) => {
                self.set_state(DownloadState::Succeeded);
                info!(bytes = tally.bytes, "download complete");
                TransferResult::success(destination, tally.response_code, tally.bytes)
            }
            Err(error) => {
                if tally.output_created {
                    remove_partial(destination).await;
                }
                self.set_state(DownloadState::Failed);
                warn!(
                    error = %error,
                    response_code = tally.response_code,
                    bytes = tally.bytes,
                    "download failed"
                );
                TransferResult::failure(destination, tally.response_code, tally.bytes, &error)
            }
        }
    }

    async fn execute(&mut self, tally: &mut Tally) -> Result<(), DownloadError> {
        self.set_state(DownloadState::Preflighting);
        self.preflight
            .prepare(self.request.destination_dir(), self.request.destination())
            .await?;

        self.set_state(DownloadState::Connecting);
        self.emit(Phase::Opening, 0, None);
        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(self.cancelled(tally)),
            response = self.client.open(self.request.source_url()) => response?,
        };
        let status = response.status().as_u16();
        tally.response_code = Some(status);
        self.emit(Phase::Connected, 0, Some(status));
        debug!(status, "connected");

        let mut reader = body_reader(response)?;

        self.set_state(DownloadState::Transferring);
        let destination = self.request.destination().to_path_buf();
        let file = File::create(&destination)
            .await
            .map_err(|e| DownloadError::io(&destination, e))?;
        tally.output_created = true;
        let mut output = BufWriter::with_capacity(self.chunk_size, file);

        let copied = self.copy_chunks(&mut reader, &mut output, tally).await;
        drop(reader);

        if let Err(error) = copied {
            close_output(output, &destination).await;
            return Err(error);
        }

        self.emit(Phase::Saving, tally.bytes, Some(status));
        finish_output(output, &destination).await?;
        self.emit(Phase::Complete, tally.bytes, Some(status));
        Ok(())
    }

    /// Marks the transfer as cancelling and builds the matching error.
    fn cancelled(&self, tally: &Tally) -> DownloadError {
        self.set_state(DownloadState::Cancelling);
        info!(bytes = tally.bytes, "cancellation requested");
        DownloadError::Cancelled { bytes: tally.bytes }
    }

    /// Copies `reader` into `writer` one chunk at a time.
    ///
    /// Each read races the cancellation token, and the token is checked
    /// again before a chunk is written or the copy reports end of body.
    async fn copy_chunks<R, W>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        tally: &mut Tally,
    ) -> Result<(), DownloadError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(self.cancelled(tally)),
                read = reader.read(&mut buffer) => read
                    .map_err(|e| DownloadError::stream(self.request.source_url().as_str(), e))?,
            };

            if self.cancel.is_cancelled() {
                return Err(self.cancelled(tally));
            }
            if read == 0 {
                return Ok(());
            }

            writer
                .write_all(&buffer[..read])
                .await
                .map_err(|e| DownloadError::io(self.request.destination(), e))?;
            tally.bytes += read as u64;

            if self.throttle.ready() {
                self.emit(Phase::Transferring, tally.bytes, tally.response_code);
            }
        }
    }
}

/// Flushes and closes the output; the file is closed when this returns.
async fn finish_output(mut output: BufWriter<File>, path: &Path) -> Result<(), DownloadError> {
    output
        .flush()
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    let file = output.into_inner();
    file.sync_all()
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    // Dropping the std handle closes the descriptor synchronously.
    drop(file.into_std().await);
    Ok(())
}

/// Closes the output on a failure path; errors are logged, never surfaced.
async fn close_output(output: BufWriter<File>, path: &Path) {
    let mut file = output.into_inner();
    if let Err(error) = file.flush().await {
        debug!(path = %path.display(), error = %error, "ignoring flush error on abandoned output");
    }
    drop(file.into_std().await);
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => warn!(path = %path.display(), error = %error, "failed to remove partial file"),
    }
}
