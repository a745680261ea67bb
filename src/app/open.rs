//! Post-download "open" action.

use std::path::Path;
use std::process::ExitStatus;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{info, warn};

/// Runs `command` with `path` appended as the last argument.
///
/// `command` is split on whitespace; the first word is the program.
pub(crate) async fn run_open_command(command: &str, path: &Path) -> Result<ExitStatus> {
    let mut words = command.split_whitespace();
    let Some(program) = words.next() else {
        bail!("open command is empty");
    };
    Command::new(program)
        .args(words)
        .arg(path)
        .status()
        .await
        .with_context(|| format!("Failed to launch open command '{program}'"))
}

/// Opens the finished file; failures are logged only.
pub(crate) async fn open_downloaded_file(command: &str, path: &Path) {
    match run_open_command(command, path).await {
        Ok(status) if status.success() => {
            info!(command, path = %path.display(), "Opened downloaded file");
        }
        Ok(status) => warn!(command, %status, "Open command exited unsuccessfully"),
        Err(error) => warn!(error = %format!("{error:#}"), "Could not open downloaded file"),
    }
}
