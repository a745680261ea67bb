//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download one file over HTTP(S) and optionally open it when done.
///
/// The destination file is replaced on every run; a failed or cancelled
/// download never leaves a partial file behind.
#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// URL to download; a bare host such as `example.com/app.apk` gets `http://`
    pub address: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory to save into (default: current directory)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// File name inside the output directory (default: last URL path segment)
    #[arg(short = 'n', long)]
    pub file_name: Option<String>,

    /// Connect timeout in seconds (1-3600, default 15)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Command run with the downloaded file path after a successful download
    #[arg(long, value_name = "COMMAND")]
    pub open: Option<String>,

    /// Emit progress and the result as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Do not check for an active network before downloading
    #[arg(long)]
    pub skip_connectivity_check: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pretend the destination volume is full (exercises the storage failure path)
    #[arg(long, hide = true)]
    pub simulate_full_disk: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_address() {
        let result = Args::try_parse_from(["fetcher"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_minimal_args_parse_successfully() {
        let args = Args::try_parse_from(["fetcher", "example.com/app.apk"]).unwrap();
        assert_eq!(args.address, "example.com/app.apk");
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.json);
        assert!(args.output_dir.is_none());
        assert!(args.connect_timeout.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["fetcher", "-vv", "x"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_output_options() {
        let args = Args::try_parse_from([
            "fetcher",
            "https://example.com/a.apk",
            "-o",
            "/tmp/apk",
            "-n",
            "app.apk",
            "--open",
            "xdg-open",
        ])
        .unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/apk")));
        assert_eq!(args.file_name.as_deref(), Some("app.apk"));
        assert_eq!(args.open.as_deref(), Some("xdg-open"));
    }

    #[test]
    fn test_cli_connect_timeout_range() {
        let args = Args::try_parse_from(["fetcher", "x", "--connect-timeout", "5"]).unwrap();
        assert_eq!(args.connect_timeout, Some(5));

        assert!(Args::try_parse_from(["fetcher", "x", "--connect-timeout", "0"]).is_err());
        assert!(Args::try_parse_from(["fetcher", "x", "--connect-timeout", "3601"]).is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["fetcher", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["fetcher", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
