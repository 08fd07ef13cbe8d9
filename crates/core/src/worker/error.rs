//! Error taxonomy of a job execution.

use std::path::PathBuf;
use thiserror::Error;

use crate::converter::ConverterError;
use crate::exporter::ExportError;
use crate::queue::QueueError;
use crate::storage::StorageError;

/// Why a job execution failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad ids or an unsupported source extension.
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    /// The uploaded source is gone.
    #[error("Input file not found: {path}")]
    InputMissing { path: PathBuf },

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Mesh conversion failed: {0}")]
    Convert(#[from] ConverterError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Failures no retry can fix. The job fails at once.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::InvalidPayload(_)
            | Self::InputMissing { .. }
            | Self::Storage(StorageError::InputOutsideUploadRoot { .. }) => true,
            Self::Export(e) => e.is_permanent(),
            _ => false,
        }
    }

    /// Short machine-friendly category, used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_)
            | Self::Storage(StorageError::InputOutsideUploadRoot { .. }) => "invalid_payload",
            Self::InputMissing { .. } => "input_missing",
            Self::Export(_) | Self::Convert(_) => "external_tool_failure",
            Self::Storage(StorageError::RemoteStoreConfig { .. }) => "remote_store_config",
            Self::Storage(StorageError::RemoteStoreFailure { .. })
            | Self::Storage(StorageError::Request(_)) => "remote_store_failure",
            Self::Storage(_) | Self::Io(_) => "io",
        }
    }
}

impl From<QueueError> for PipelineError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::InvalidPayload(msg) => PipelineError::InvalidPayload(msg),
            other => PipelineError::Io(std::io::Error::other(other.to_string())),
        }
    }
}
