//! CLI entry point for the fetcher tool.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod app;
mod cli;

use app::config::{self, Settings};
use cli::Args;

/// Process exit outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// File downloaded.
    Success,
    /// Transfer failed.
    Failure,
    /// Bad arguments, address, or configuration.
    Usage,
    /// Cancelled by Ctrl-C.
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Usage => 2,
            Self::Interrupted => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let file_config = match config::load_file_config(args.config.as_deref()) {
        Ok(file_config) => file_config,
        Err(error) => return report_usage_error(&error),
    };

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config > default (info)
    app::terminal::init_tracing(config::resolve_default_log_level(&args, &file_config));
    debug!(?args, "CLI arguments parsed");

    let settings = match Settings::resolve(&args, &file_config) {
        Ok(settings) => settings,
        Err(error) => return report_usage_error(&error),
    };

    match app::orchestrator::run_fetcher(settings).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => report_usage_error(&error),
    }
}

fn report_usage_error(error: &anyhow::Error) -> ExitCode {
    eprintln!("Error: {error:#}");
    ExitCode::from(ProcessExit::Usage.code())
}
