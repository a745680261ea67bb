//! Fetcher Core Library
//!
//! This library provides the download engine behind the `fetcher` tool:
//! fetch one file over HTTP(S) into local storage, report progress while it
//! streams, and leave either a complete file or nothing at all.
//!
//! # Architecture
//!
//! - [`download`] - storage preflight, connectivity check, HTTP client,
//!   and the single-transfer engine with its progress and result types
//!
//! Presentation (progress rendering, notifications, opening the finished
//! file) belongs to the caller; the `fetcher` binary is one such caller.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
mod user_agent;

// Re-export commonly used types
pub use download::{
    ConnectivityCheck, DownloadEngine, DownloadError, DownloadRequest, DownloadState,
    FailureKind, HttpClient, Outcome, Phase, ProgressEvent, ProgressReporter, RouteProbe,
    StorageError, StoragePreflight, TransferHandle, TransferResult, normalize_address,
};
