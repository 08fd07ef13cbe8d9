//! Per-execution scratch directories.

use std::path::{Path, PathBuf};

use crate::queue::ConversionJob;

/// `<scratch_root>/<fileId>/<conversionId>/`, private to one job execution set.
///
/// Only build one from a payload that passed [`ConversionJob::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchContext {
    root: PathBuf,
    dir: PathBuf,
}

impl ScratchContext {
    pub fn for_job(scratch_root: &Path, job: &ConversionJob) -> Self {
        Self {
            root: scratch_root.to_path_buf(),
            dir: scratch_root.join(&job.file_id).join(&job.conversion_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Where the exporter writes the interchange file and texture folders.
    pub fn export_dir(&self) -> PathBuf {
        self.dir.join("export")
    }

    /// Staged copy of the source under its true extension.
    pub fn source_path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("source.{extension}"))
    }

    /// Where the converter writes the container.
    pub fn converted_glb(&self) -> PathBuf {
        self.dir.join("model.glb")
    }

    pub async fn create(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Remove the directory recursively, then the per-file parent if empty.
    pub async fn remove(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        if let Some(parent) = self.dir.parent() {
            if parent != self.root {
                // Fails harmlessly while sibling conversions still use it.
                let _ = tokio::fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }
}
