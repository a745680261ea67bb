//! Terminal outcome of a transfer.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::{DownloadError, FailureKind};

/// Success or the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Every byte was written and the file closed.
    Success,
    /// The transfer ended without a usable file.
    Failure(FailureKind),
}

/// The single, final result delivered once per transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    /// Success or failure class.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// HTTP status, when the connection got that far.
    pub response_code: Option<u16>,
    /// Human-readable failure reason; `None` on success.
    pub message: Option<String>,
    /// Bytes written to the destination.
    pub bytes_transferred: u64,
    /// The destination path of the transfer.
    pub destination: PathBuf,
}

impl TransferResult {
    pub(crate) fn success(
        destination: &Path,
        response_code: Option<u16>,
        bytes_transferred: u64,
    ) -> Self {
        Self {
            outcome: Outcome::Success,
            response_code,
            message: None,
            bytes_transferred,
            destination: destination.to_path_buf(),
        }
    }

    pub(crate) fn failure(
        destination: &Path,
        response_code: Option<u16>,
        bytes_transferred: u64,
        error: &DownloadError,
    ) -> Self {
        Self {
            outcome: Outcome::Failure(error.kind()),
            response_code,
            message: Some(error.to_string()),
            bytes_transferred,
            destination: destination.to_path_buf(),
        }
    }

    /// Result for a transfer whose task ended without reporting.
    pub(crate) fn lost(destination: &Path, reason: &str) -> Self {
        Self {
            outcome: Outcome::Failure(FailureKind::Io),
            response_code: None,
            message: Some(reason.to_string()),
            bytes_transferred: 0,
            destination: destination.to_path_buf(),
        }
    }

    /// Returns true for [`Outcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Returns the failure class, if any.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            Outcome::Success => None,
            Outcome::Failure(kind) => Some(kind),
        }
    }

    /// `<code>:<message>` for failures (code `0` when none was received),
    /// empty for success.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.outcome {
            Outcome::Success => String::new(),
            Outcome::Failure(_) => format!(
                "{}:{}",
                self.response_code.unwrap_or(0),
                self.message.as_deref().unwrap_or_default()
            ),
        }
    }
}
