//! One fetcher run: settings, connectivity, transfer, open.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use fetcher_core::{
    ConnectivityCheck, DownloadEngine, DownloadRequest, HttpClient, ProgressReporter, RouteProbe,
    StoragePreflight, TransferHandle, TransferResult,
};
use tracing::{debug, error, info, warn};

use crate::ProcessExit;
use crate::app::config::Settings;
use crate::app::{exit_handler, open, reporter, terminal};

/// Downloads the configured file and maps the outcome to an exit code.
pub(crate) async fn run_fetcher(settings: Settings) -> Result<ProcessExit> {
    debug!(?settings, "settings resolved");

    if settings.check_connectivity && !RouteProbe::default().is_reachable().await {
        error!("No active network connection");
        return Ok(ProcessExit::Failure);
    }

    let client = HttpClient::with_connect_timeout(settings.connect_timeout);
    let engine = DownloadEngine::new(client)
        .with_preflight(StoragePreflight::new().simulate_exhaustion(settings.simulate_exhaustion))
        .with_progress_interval(settings.progress_interval);

    let request = DownloadRequest::new(settings.url.as_str(), settings.destination.clone())
        .context("Invalid download request")?;
    info!(
        url = %settings.url,
        path = %settings.destination.display(),
        "Fetcher starting"
    );

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        settings.quiet,
        settings.json,
        terminal::is_dumb_terminal(),
    );
    let mut reporter = reporter::build_reporter(settings.json, use_spinner);

    let handle = engine.start(request)?;
    let Some(result) = drive_with_interrupt(handle, reporter.as_mut()).await else {
        warn!("Interrupted again, abandoning download");
        return Ok(ProcessExit::Interrupted);
    };

    if result.is_success() {
        if !settings.json {
            println!("{}", result.destination.display());
        }
        if let Some(command) = settings.open_command.as_deref() {
            open::open_downloaded_file(command, &result.destination).await;
        }
    } else if !settings.json {
        eprintln!("Download failed: {}", result.summary());
    }

    Ok(exit_handler::determine_exit_outcome(&result))
}

/// Runs the handle to completion, cancelling it on the first Ctrl-C.
///
/// Returns `None` when a second Ctrl-C arrives before the cancelled
/// transfer has reported its result.
async fn drive_with_interrupt(
    handle: TransferHandle,
    reporter: &mut dyn ProgressReporter,
) -> Option<TransferResult> {
    let canceller = handle.canceller();
    let run = handle.run(reporter);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => return Some(result),
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                warn!("Interrupted, cancelling download (press Ctrl-C again to quit)");
                canceller.cancel();
            }
            Err(error) => {
                debug!(error = %error, "Ctrl-C handler unavailable");
                return Some(run.await);
            }
        },
    }

    tokio::select! {
        result = &mut run => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    }
}
