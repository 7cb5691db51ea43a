//! Scoped staging of the analytics service-account credential
//!
//! The key is supplied as an opaque JSON blob. For the duration of one request
//! it is written to a private temporary file the Google client reads from;
//! dropping the guard removes the file, whichever way the request ends.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    config::AnalyticsConfig,
    error::{AppError, AppResult},
};

/// Credential file available for the lifetime of this guard
#[derive(Debug)]
pub struct StagedCredentials {
    path: PathBuf,
    /// Present when the file was created by us and must be removed
    staged: Option<NamedTempFile>,
}

impl StagedCredentials {
    /// Make the configured credential readable from a file.
    ///
    /// An inline blob wins over a key file path. A configured key file is
    /// used in place and left untouched.
    pub fn acquire(config: &AnalyticsConfig) -> AppResult<Self> {
        if let Some(blob) = config.credentials_json.as_deref() {
            return match config.staging_dir.as_deref() {
                Some(dir) => Self::stage_in(blob, Path::new(dir)),
                None => Self::stage(blob),
            };
        }

        if let Some(path) = config.credentials_file.as_deref() {
            return Ok(Self {
                path: PathBuf::from(path),
                staged: None,
            });
        }

        Err(AppError::Configuration(
            "GA_CREDENTIALS environment variable not set".to_string(),
        ))
    }

    /// Write `blob` to a fresh temporary file (mode 0600 on unix)
    pub fn stage(blob: &str) -> AppResult<Self> {
        Self::stage_in(blob, &std::env::temp_dir())
    }

    /// Same as [`stage`](Self::stage), inside `dir`
    pub fn stage_in(blob: &str, dir: &Path) -> AppResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("ga-credentials-")
            .suffix(".json")
            .tempfile_in(dir)
            .map_err(|e| AppError::Internal(format!("Failed to stage credentials: {}", e)))?;

        file.write_all(blob.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| AppError::Internal(format!("Failed to stage credentials: {}", e)))?;

        tracing::debug!(path = %file.path().display(), "Staged analytics credentials");

        Ok(Self {
            path: file.path().to_path_buf(),
            staged: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file is removed on drop
    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }
}

impl Drop for StagedCredentials {
    fn drop(&mut self) {
        if let Some(file) = self.staged.take() {
            match file.close() {
                Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged credentials"),
                Err(e) => tracing::error!(
                    path = %self.path.display(),
                    "Failed to remove staged credentials: {}",
                    e
                ),
            }
        }
    }
}
