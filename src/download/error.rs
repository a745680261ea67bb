//! Error types for the download module.
//!
//! This module defines structured errors for all download operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while preparing the destination before any network I/O.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A pre-existing file at the destination could not be removed.
    #[error("delete failed: could not remove existing file {path}")]
    DeleteFailed {
        /// The destination that is still present.
        path: PathBuf,
    },

    /// The writability probe could not be created.
    #[error("create failed: cannot create {path}: {source}")]
    CreateFailed {
        /// The probe path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The volume holding the destination reports no free space.
    #[error("insufficient space: no free space on the volume containing {path}")]
    InsufficientSpace {
        /// The destination directory.
        path: PathBuf,
    },

    /// Free space could not be queried at all.
    #[error("storage error: cannot query free space for {path}: {source}")]
    SpaceQuery {
        /// The destination directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during a transfer.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Destination preflight failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The connection could not be established within the connect timeout.
    #[error("timeout connecting to {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with an error status and the body was refused.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Reading the response body failed mid-transfer.
    #[error("stream error reading {url}: {source}")]
    Stream {
        /// The URL being read.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The caller cancelled the transfer.
    #[error("cancelled after {bytes} bytes")]
    Cancelled {
        /// Bytes written before cancellation took effect.
        bytes: u64,
    },

    /// `start` was called while another transfer is active.
    #[error("a transfer is already in progress")]
    ConcurrentTransfer,

    /// The provided URL is malformed or not http(s).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The destination path has no file name.
    #[error("invalid destination: {path}")]
    InvalidDestination {
        /// The rejected path.
        path: PathBuf,
    },
}

/// Coarse classification of a failed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Destination directory/file/space problem.
    Storage,
    /// Connect failure, timeout, DNS, refused body.
    Network,
    /// Read or write failure mid-transfer.
    Io,
    /// Caller-initiated abort.
    Cancelled,
    /// Rejected because another transfer was active.
    ConcurrentTransfer,
    /// The request itself was malformed.
    InvalidRequest,
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a body read error.
    pub fn stream(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Stream {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Classifies the error into the failure taxonomy reported to callers.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Storage(_) => FailureKind::Storage,
            Self::Network { .. } | Self::Timeout { .. } | Self::HttpStatus { .. } => {
                FailureKind::Network
            }
            Self::Stream { .. } | Self::Io { .. } => FailureKind::Io,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::ConcurrentTransfer => FailureKind::ConcurrentTransfer,
            Self::InvalidUrl { .. } | Self::InvalidDestination { .. } => {
                FailureKind::InvalidRequest
            }
        }
    }
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: every variant needs a
// url or path the source error does not carry.
