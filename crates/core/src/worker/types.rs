//! Stages, source formats and typed stage outcomes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::PipelineError;

/// Where a job execution is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Exporting,
    Converting,
    Validating,
    Compressing,
    Storing,
    Completed,
    Failed,
}

impl Stage {
    /// Progress checkpoint reported when the stage starts.
    pub fn progress(&self) -> u8 {
        match self {
            Stage::Queued | Stage::Failed => 0,
            Stage::Exporting => 10,
            Stage::Converting => 30,
            Stage::Validating => 40,
            Stage::Compressing | Stage::Storing => 70,
            Stage::Completed => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Queued => "queued",
            Stage::Exporting => "exporting",
            Stage::Converting => "converting",
            Stage::Validating => "validating",
            Stage::Compressing => "compressing",
            Stage::Storing => "storing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a source file enters the pipeline, by its true extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFormat {
    /// Needs the exporter first (`.skp`).
    Proprietary { extension: String },
    /// The mesh converter reads it directly.
    Interchange { extension: String },
    /// Already a GLB container.
    Container,
}

pub const PROPRIETARY_EXTENSIONS: &[&str] = &["skp"];
pub const CONTAINER_EXTENSION: &str = "glb";

impl SourceFormat {
    /// Classify by `original_filename`, falling back to the input path's
    /// extension when the upload name has none.
    pub fn detect(
        original_filename: &str,
        input_path: &Path,
        interchange_formats: &[&str],
    ) -> Result<Self, PipelineError> {
        let extension = extension_of(Path::new(original_filename))
            .or_else(|| extension_of(input_path))
            .ok_or_else(|| {
                PipelineError::InvalidPayload(format!(
                    "cannot determine the extension of {original_filename:?}"
                ))
            })?;

        if PROPRIETARY_EXTENSIONS.contains(&extension.as_str()) {
            Ok(SourceFormat::Proprietary { extension })
        } else if extension == CONTAINER_EXTENSION {
            Ok(SourceFormat::Container)
        } else if interchange_formats.contains(&extension.as_str()) {
            Ok(SourceFormat::Interchange { extension })
        } else {
            Err(PipelineError::InvalidPayload(format!(
                "unsupported source extension .{extension}"
            )))
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            SourceFormat::Proprietary { extension } | SourceFormat::Interchange { extension } => {
                extension
            }
            SourceFormat::Container => CONTAINER_EXTENSION,
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

/// The 1-based attempt being executed and the attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub number: u32,
    pub max_attempts: u32,
}

impl Attempt {
    pub fn new(number: u32, max_attempts: u32) -> Self {
        Self {
            number,
            max_attempts,
        }
    }

    pub fn is_final(&self) -> bool {
        self.number >= self.max_attempts
    }
}

/// The source, ready for the first stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: SourceFormat,
    /// Directory the source's relative references resolve against.
    pub working_dir: PathBuf,
}

/// An interchange file the converter can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interchange {
    pub path: PathBuf,
    pub working_dir: PathBuf,
    pub texture_dirs: Vec<PathBuf>,
}

/// A GLB container awaiting publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub glb_path: PathBuf,
    pub texture_dirs: Vec<PathBuf>,
}
