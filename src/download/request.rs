//! Transfer requests and address normalization.

use std::path::{Path, PathBuf};

use url::Url;

use super::error::DownloadError;

/// One URL to one destination file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    source_url: Url,
    destination: PathBuf,
}

impl DownloadRequest {
    /// Validates and builds a request.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] unless `source_url` is an absolute
    /// `http`/`https` URL with a host, and [`DownloadError::InvalidDestination`]
    /// if `destination` has no file name.
    pub fn new(source_url: &str, destination: impl Into<PathBuf>) -> Result<Self, DownloadError> {
        let parsed = parse_http_url(source_url)
            .ok_or_else(|| DownloadError::invalid_url(source_url.to_string()))?;
        let destination = destination.into();
        if destination.file_name().is_none() {
            return Err(DownloadError::InvalidDestination { path: destination });
        }
        Ok(Self {
            source_url: parsed,
            destination,
        })
    }

    /// Builds a request for `file_name` inside `dir`.
    ///
    /// # Errors
    ///
    /// Same as [`DownloadRequest::new`].
    pub fn in_dir(source_url: &str, dir: &Path, file_name: &str) -> Result<Self, DownloadError> {
        Self::new(source_url, dir.join(file_name))
    }

    /// The URL to fetch.
    #[must_use]
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// The final file path.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// The directory holding the destination (`.` for a bare file name).
    #[must_use]
    pub fn destination_dir(&self) -> &Path {
        match self.destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Turns user-typed text into a fetchable URL.
///
/// Input without any `:` is treated as a bare host and gets an `http://`
/// prefix. Returns `None` for empty input or anything that does not end up
/// as an absolute http(s) URL.
#[must_use]
pub fn normalize_address(input: &str) -> Option<Url> {
    let address = input.trim();
    if address.is_empty() {
        return None;
    }
    if address.contains(':') {
        parse_http_url(address)
    } else {
        parse_http_url(&format!("http://{address}"))
    }
}

fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    let supported = matches!(url.scheme(), "http" | "https");
    (supported && url.host_str().is_some_and(|host| !host.is_empty())).then_some(url)
}
