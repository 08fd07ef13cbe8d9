//! Error types for the storage module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while publishing or storing an artifact.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Remote mode is selected but cannot be used as configured.
    #[error("Remote store misconfigured: {reason}")]
    RemoteStoreConfig { reason: String },

    /// The remote store answered with a non-success status.
    #[error("Remote store returned {status}: {body}")]
    RemoteStoreFailure { status: u16, body: String },

    /// The request never got a response.
    #[error("Remote store request failed: {0}")]
    Request(String),

    /// A job input that does not resolve to a file under the upload root.
    #[error("Input {path} is outside the upload root")]
    InputOutsideUploadRoot { path: PathBuf },

    /// The artifact to store does not exist.
    #[error("Artifact not found: {path}")]
    ArtifactMissing { path: PathBuf },

    /// The published copy does not match its source.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn remote_config(reason: impl Into<String>) -> Self {
        Self::RemoteStoreConfig {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Request(e.to_string())
    }
}
