//! Types for mesh conversion jobs.

use std::path::PathBuf;

/// A single mesh conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshConversionJob {
    /// Job id for logging.
    pub job_id: String,
    /// Interchange file to convert.
    pub input_path: PathBuf,
    /// Where the GLB container is written.
    pub output_path: PathBuf,
    /// Current directory of the converter process. Relative texture paths in
    /// the interchange file resolve against it.
    pub working_dir: PathBuf,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshConversionResult {
    pub job_id: String,
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
}
