//! Configuration file loading and merging with CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use fetcher_core::download::{CONNECT_TIMEOUT_SECS, PROGRESS_INTERVAL};
use url::Url;

use crate::cli::Args;

/// File name used when the URL path has no usable last segment.
pub(crate) const FALLBACK_FILE_NAME: &str = "download.bin";

/// TOML-style file configuration for fetcher defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    /// Default output directory.
    pub(crate) output_dir: Option<PathBuf>,
    /// Fixed destination file name.
    pub(crate) file_name: Option<String>,
    /// Connect timeout in seconds.
    pub(crate) connect_timeout_secs: Option<u64>,
    /// Spacing of byte-count progress events in milliseconds.
    pub(crate) progress_interval_ms: Option<u64>,
    /// Command run with the finished file.
    pub(crate) open_command: Option<String>,
    /// Whether to check connectivity before downloading.
    pub(crate) check_connectivity: Option<bool>,
    /// Pretend the destination volume is full.
    pub(crate) simulate_exhaustion: Option<bool>,
    /// Default verbosity mode.
    pub(crate) verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against CLI constraints.
    pub(crate) fn validate(&self) -> Result<()> {
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600)?;
        validate_range("progress_interval_ms", self.progress_interval_ms, 1, 60_000)?;
        if let Some(name) = &self.file_name {
            validate_file_name(name)
                .with_context(|| format!("Invalid config value for `file_name`: '{name}'"))?;
        }
        Ok(())
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        bail!("file name must be a single path component");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log level used when neither `RUST_LOG` nor CLI flags say otherwise.
    pub(crate) fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose | Self::Debug => "debug",
            Self::Quiet => "error",
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/fetcher/config.toml`
/// 2. `$HOME/.config/fetcher/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("fetcher")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("fetcher")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config named on the command line, or the default one if present.
///
/// An explicit path must exist; a missing default file is not an error.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

pub(crate) fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "file_name" => {
                cfg.file_name = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "progress_interval_ms" => {
                cfg.progress_interval_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "open_command" => {
                cfg.open_command = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "check_connectivity" => {
                cfg.check_connectivity = Some(parse_boolean(value).with_context(invalid)?);
            }
            "simulate_exhaustion" => {
                cfg.simulate_exhaustion = Some(parse_boolean(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Effective settings for one run: CLI flags over config file over defaults.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) url: Url,
    pub(crate) destination: PathBuf,
    pub(crate) connect_timeout: Duration,
    pub(crate) progress_interval: Duration,
    pub(crate) open_command: Option<String>,
    pub(crate) check_connectivity: bool,
    pub(crate) simulate_exhaustion: bool,
    pub(crate) json: bool,
    pub(crate) quiet: bool,
}

impl Settings {
    /// Merges parsed flags with the loaded file config.
    pub(crate) fn resolve(args: &Args, file: &FileConfig) -> Result<Self> {
        let Some(url) = fetcher_core::normalize_address(&args.address) else {
            bail!("Not a valid http(s) address: '{}'", args.address);
        };

        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = match args.file_name.clone().or_else(|| file.file_name.clone()) {
            Some(name) => {
                validate_file_name(&name)
                    .with_context(|| format!("Invalid file name '{name}'"))?;
                name
            }
            None => file_name_from_url(&url),
        };

        let connect_secs = args
            .connect_timeout
            .or(file.connect_timeout_secs)
            .unwrap_or(CONNECT_TIMEOUT_SECS);
        let progress_interval = file
            .progress_interval_ms
            .map_or(PROGRESS_INTERVAL, Duration::from_millis);

        Ok(Self {
            url,
            destination: output_dir.join(file_name),
            connect_timeout: Duration::from_secs(connect_secs),
            progress_interval,
            open_command: args.open.clone().or_else(|| file.open_command.clone()),
            check_connectivity: !args.skip_connectivity_check
                && file.check_connectivity.unwrap_or(true),
            simulate_exhaustion: args.simulate_full_disk
                || file.simulate_exhaustion.unwrap_or(false),
            json: args.json,
            quiet: args.quiet || file.verbosity == Some(VerbositySetting::Quiet),
        })
    }
}

/// Default log level: quiet flag > verbose count > config verbosity > info.
pub(crate) fn resolve_default_log_level(args: &Args, file: &FileConfig) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file.verbosity.map_or("info", VerbositySetting::log_level),
        1 => "debug",
        _ => "trace",
    }
}

/// Last non-empty URL path segment, or [`FALLBACK_FILE_NAME`].
pub(crate) fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| validate_file_name(segment).is_ok())
        .map_or_else(|| FALLBACK_FILE_NAME.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["fetcher"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("args should parse")
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
connect_timeout_secs = 20
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.connect_timeout_secs, Some(20));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.output_dir.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/sdcard/apk"
file_name = "PeerGrading.apk" # fixed name
connect_timeout_secs = 15
progress_interval_ms = 250
open_command = "xdg-open"
check_connectivity = false
simulate_exhaustion = true
verbosity = "quiet"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/sdcard/apk")));
        assert_eq!(cfg.file_name.as_deref(), Some("PeerGrading.apk"));
        assert_eq!(cfg.progress_interval_ms, Some(250));
        assert_eq!(cfg.open_command.as_deref(), Some("xdg-open"));
        assert_eq!(cfg.check_connectivity, Some(false));
        assert_eq!(cfg.simulate_exhaustion, Some(true));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout_value() {
        let err = parse_config_str("connect_timeout_secs = 0").expect_err("invalid timeout");
        assert!(err.to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("progress_interval_ms = 4 trailing")
            .expect_err("expected trailing token error");
        assert!(err.to_string().contains("progress_interval_ms"));
    }

    #[test]
    fn test_parse_config_rejects_file_name_with_separator() {
        let err = parse_config_str(r#"file_name = "../escape.apk""#).expect_err("bad name");
        assert!(err.to_string().contains("file_name"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_boolean() {
        let err = parse_config_str("check_connectivity = yes").expect_err("invalid boolean");
        assert!(err.to_string().contains("check_connectivity"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_settings_cli_overrides_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("/from/config")),
            connect_timeout_secs: Some(30),
            open_command: Some("config-open".to_string()),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(
            &args(&[
                "example.com/files/app.apk",
                "-o",
                "/from/cli",
                "--connect-timeout",
                "5",
            ]),
            &file,
        )
        .expect("settings should resolve");

        assert_eq!(settings.url.as_str(), "http://example.com/files/app.apk");
        assert_eq!(settings.destination, PathBuf::from("/from/cli/app.apk"));
        assert_eq!(settings.connect_timeout, Duration::from_secs(5));
        assert_eq!(settings.open_command.as_deref(), Some("config-open"));
        assert!(settings.check_connectivity);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::resolve(&args(&["https://example.com/"]), &FileConfig::default())
            .expect("settings should resolve");
        assert_eq!(settings.destination, PathBuf::from(".").join(FALLBACK_FILE_NAME));
        assert_eq!(settings.connect_timeout, Duration::from_secs(15));
        assert_eq!(settings.progress_interval, PROGRESS_INTERVAL);
        assert!(!settings.simulate_exhaustion);
    }

    #[test]
    fn test_settings_rejects_unsupported_address() {
        let err = Settings::resolve(&args(&["ftp://example.com/a"]), &FileConfig::default())
            .expect_err("ftp is not supported");
        assert!(err.to_string().contains("ftp://example.com/a"));
    }

    #[test]
    fn test_settings_skip_connectivity_flag_wins() {
        let file = FileConfig {
            check_connectivity: Some(true),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(
            &args(&["example.com/a", "--skip-connectivity-check"]),
            &file,
        )
        .expect("settings should resolve");
        assert!(!settings.check_connectivity);
    }

    #[test]
    fn test_log_level_priority() {
        let quiet_file = FileConfig {
            verbosity: Some(VerbositySetting::Quiet),
            ..FileConfig::default()
        };
        assert_eq!(resolve_default_log_level(&args(&["x"]), &quiet_file), "error");
        assert_eq!(resolve_default_log_level(&args(&["x", "-v"]), &quiet_file), "debug");
        assert_eq!(
            resolve_default_log_level(&args(&["x", "-vv"]), &FileConfig::default()),
            "trace"
        );
        assert_eq!(
            resolve_default_log_level(&args(&["x", "-q", "-v"]), &FileConfig::default()),
            "error"
        );
    }

    #[test]
    fn test_file_name_from_url() {
        let url = Url::parse("https://example.com/dl/PeerGrading.apk?x=1").unwrap();
        assert_eq!(file_name_from_url(&url), "PeerGrading.apk");
        let root = Url::parse("https://example.com/").unwrap();
        assert_eq!(file_name_from_url(&root), FALLBACK_FILE_NAME);
    }
}
