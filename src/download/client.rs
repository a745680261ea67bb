//! HTTP client wrapper for downloading files.
//!
//! This module provides the `HttpClient` struct which opens the connection
//! with the fixed connect timeout and hands the response body out as a
//! chunk-readable stream.

use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::Client;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;
use crate::user_agent;

/// HTTP client for single-file downloads.
///
/// Only the connection phase is bounded by a timeout; once bytes flow the
/// transfer may take as long as it needs. Cloning is cheap and shares the
/// connection pool.
///
/// # Example
///
/// ```no_run
/// use fetcher_core::download::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let url = url::Url::parse("https://example.com/app.apk")?;
/// let response = client.open(&url).await?;
/// println!("status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    connect_timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default 15 second connect timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    }

    /// Creates a client with an explicit connect timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent::default_download_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            connect_timeout,
        }
    }

    /// Returns the configured connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Sends a GET and returns once the response head has arrived.
    ///
    /// The status is not checked here; callers see every response code.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Timeout`] when the connect timeout elapses and
    /// [`DownloadError::Network`] for any other connection failure.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn open(&self, url: &Url) -> Result<reqwest::Response, DownloadError> {
        debug!("opening connection");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;
        debug!(status = response.status().as_u16(), "response received");
        Ok(response)
    }
}

/// Opens the response body as an `AsyncRead`.
///
/// Error statuses have no usable body: the stream is refused with
/// [`DownloadError::HttpStatus`], the way a plain URL stream refuses to open
/// on a 4xx/5xx answer.
///
/// # Errors
///
/// Returns [`DownloadError::HttpStatus`] for status codes of 400 and above.
pub fn body_reader(
    response: reqwest::Response,
) -> Result<impl AsyncRead + Unpin + Send, DownloadError> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(DownloadError::http_status(
            response.url().as_str(),
            status.as_u16(),
        ));
    }
    let stream = response.bytes_stream().map_err(std::io::Error::other);
    Ok(StreamReader::new(Box::pin(stream)))
}
