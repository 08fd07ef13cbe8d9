//! Exporter trait and request/response types.

use async_trait::async_trait;
use std::path::PathBuf;

use super::ExportError;

/// One export of a proprietary source into an interchange file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Job id, for logs and the generated script.
    pub job_id: String,
    /// Source file, already carrying its true extension.
    pub input_path: PathBuf,
    /// Scratch directory owned by this job execution. Helper files go here.
    pub work_dir: PathBuf,
    /// Directory the interchange file and its texture folders are written to.
    pub output_dir: PathBuf,
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub interchange_path: PathBuf,
    /// Texture folders written beside the interchange file.
    pub texture_dirs: Vec<PathBuf>,
    /// Name of the invocation strategy that worked.
    pub strategy: String,
    pub duration_ms: u64,
}

/// Drives an external exporter.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Exporter name for logging.
    fn name(&self) -> &str;

    /// Extension of the interchange file this exporter writes.
    fn interchange_extension(&self) -> &str;

    async fn export(&self, request: ExportRequest) -> Result<ExportOutput, ExportError>;

    /// Check that the exporter is configured and its executable exists.
    async fn validate(&self) -> Result<(), ExportError>;
}
