//! Exit code logic for the fetcher process.
//!
//! Single responsibility: map the terminal transfer result to the process exit outcome.

use fetcher_core::{FailureKind, TransferResult};

use crate::ProcessExit;

/// Determines the process exit outcome from the terminal result.
pub(crate) fn determine_exit_outcome(result: &TransferResult) -> ProcessExit {
    match result.failure_kind() {
        None => ProcessExit::Success,
        Some(FailureKind::Cancelled) => ProcessExit::Interrupted,
        Some(_) => ProcessExit::Failure,
    }
}
