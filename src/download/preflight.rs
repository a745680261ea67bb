//! Storage checks run before any network I/O.
//!
//! [`StoragePreflight::prepare`] leaves the destination directory present, the
//! destination path empty, and confirms the volume can take new files.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs::OpenOptions;
use tracing::{debug, instrument, warn};

use super::error::StorageError;

/// Destination preparation and coarse free-space check.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoragePreflight {
    simulate_exhaustion: bool,
}

impl StoragePreflight {
    /// Creates a preflight that queries the real volume.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the space check report zero available bytes.
    #[must_use]
    pub fn simulate_exhaustion(mut self, enabled: bool) -> Self {
        self.simulate_exhaustion = enabled;
        self
    }

    /// Prepares `destination_file` inside `destination_dir`.
    ///
    /// Safe to call before every transfer; repeated calls give the same answer.
    ///
    /// # Errors
    ///
    /// - [`StorageError::DeleteFailed`] if an existing file cannot be removed
    /// - [`StorageError::CreateFailed`] if a probe file cannot be created
    /// - [`StorageError::InsufficientSpace`] if the volume has no free space
    /// - [`StorageError::SpaceQuery`] if free space cannot be determined
    #[instrument(level = "debug", skip(self), fields(dir = %destination_dir.display(), file = %destination_file.display()))]
    pub async fn prepare(
        &self,
        destination_dir: &Path,
        destination_file: &Path,
    ) -> Result<(), StorageError> {
        // A failure here surfaces as CreateFailed below.
        if let Err(error) = tokio::fs::create_dir_all(destination_dir).await {
            warn!(error = %error, "could not create destination directory");
        }

        match tokio::fs::remove_file(destination_file).await {
            Ok(()) => debug!("removed existing destination file"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => debug!(error = %error, "existing destination not removed"),
        }
        if matches!(tokio::fs::try_exists(destination_file).await, Ok(true)) {
            return Err(StorageError::DeleteFailed {
                path: destination_file.to_path_buf(),
            });
        }

        let probe = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination_file)
            .await
            .map_err(|source| StorageError::CreateFailed {
                path: destination_file.to_path_buf(),
                source,
            })?;
        drop(probe);
        if let Err(error) = tokio::fs::remove_file(destination_file).await {
            warn!(error = %error, "could not remove writability probe");
        }

        let available = self.available_space(destination_dir)?;
        debug!(available, "free space on destination volume");
        if available == 0 {
            return Err(StorageError::InsufficientSpace {
                path: destination_dir.to_path_buf(),
            });
        }

        Ok(())
    }

    fn available_space(&self, dir: &Path) -> Result<u64, StorageError> {
        if self.simulate_exhaustion {
            debug!("simulating exhausted storage");
            return Ok(0);
        }
        fs2::available_space(dir).map_err(|source| StorageError::SpaceQuery {
            path: dir.to_path_buf(),
            source,
        })
    }
}
