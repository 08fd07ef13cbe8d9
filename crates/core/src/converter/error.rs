//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during mesh conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Converter binary not found.
    #[error("Mesh converter not found at path: {path}")]
    ConverterNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Conversion process failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The converter exited cleanly but wrote nothing usable.
    #[error("Converter produced no output at {path}")]
    OutputMissing { path: PathBuf },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Copying texture folders failed.
    #[error("Failed to copy side-car directory {path}: {reason}")]
    SidecarCopyFailed { path: PathBuf, reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }
}
