//! Progress rendering for the command line.

use std::io::Write;
use std::time::Duration;

use fetcher_core::download::TracingReporter;
use fetcher_core::{Phase, ProgressEvent, ProgressReporter, TransferResult};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

/// Picks the reporter for this run.
pub(crate) fn build_reporter(json: bool, use_spinner: bool) -> Box<dyn ProgressReporter> {
    if json {
        Box::new(JsonReporter::new(std::io::stdout()))
    } else if use_spinner {
        Box::new(ConsoleReporter::with_spinner())
    } else {
        Box::new(ConsoleReporter::plain())
    }
}

/// Spinner on an interactive stderr, tracing lines otherwise.
pub(crate) struct ConsoleReporter {
    spinner: Option<ProgressBar>,
    fallback: TracingReporter,
}

impl ConsoleReporter {
    pub(crate) fn with_spinner() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self {
            spinner: Some(spinner),
            fallback: TracingReporter,
        }
    }

    pub(crate) fn plain() -> Self {
        Self {
            spinner: None,
            fallback: TracingReporter,
        }
    }
}

pub(crate) fn progress_message(event: &ProgressEvent) -> String {
    match event.phase {
        Phase::Opening => "Connecting...".to_string(),
        Phase::Connected => match event.response_code {
            Some(code) => format!("Connected ({code})"),
            None => "Connected".to_string(),
        },
        Phase::Transferring => format!("Downloading... {} KiB", event.bytes_so_far / 1024),
        Phase::Saving => "Saving...".to_string(),
        Phase::Complete => "Saved".to_string(),
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_progress(&mut self, event: &ProgressEvent) {
        match &self.spinner {
            Some(spinner) => spinner.set_message(progress_message(event)),
            None => self.fallback.on_progress(event),
        }
    }

    fn on_complete(&mut self, result: &TransferResult) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.fallback.on_complete(result);
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonLine<'a> {
    Progress(&'a ProgressEvent),
    Complete(&'a TransferResult),
}

/// Writes one JSON object per event.
pub(crate) struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub(crate) fn new(out: W) -> Self {
        Self { out }
    }

    fn write_line(&mut self, line: &JsonLine<'_>) {
        let written = serde_json::to_writer(&mut self.out, line)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(error) = written {
            warn!(error = %error, "failed to write JSON event");
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressReporter for JsonReporter<W> {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self.write_line(&JsonLine::Progress(event));
    }

    fn on_complete(&mut self, result: &TransferResult) {
        self.write_line(&JsonLine::Complete(result));
    }
}
