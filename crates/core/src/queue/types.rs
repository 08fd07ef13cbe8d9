//! Job payloads, options and state as tracked by the queue.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::storage::StorageKind;
use crate::validator::GlbReport;

use super::QueueError;

/// Identifiers end up as path components, so they are restricted to a safe alphabet.
static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid id regex"));

/// Kind of work a queued job asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Export (when needed) and convert a 3D source into a GLB container.
    #[serde(rename = "convert-skp-to-glb")]
    ConvertSkpToGlb,
    /// Store an already-binary GLB upload as-is.
    #[serde(rename = "store-glb")]
    StoreGlb,
}

impl JobKind {
    /// All job kinds, in claim-loop order.
    pub const ALL: [JobKind; 2] = [JobKind::ConvertSkpToGlb, JobKind::StoreGlb];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ConvertSkpToGlb => "convert-skp-to-glb",
            JobKind::StoreGlb => "store-glb",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "convert-skp-to-glb" => Ok(JobKind::ConvertSkpToGlb),
            "store-glb" => Ok(JobKind::StoreGlb),
            other => Err(QueueError::InvalidPayload(format!(
                "unknown job type: {other}"
            ))),
        }
    }
}

/// Payload submitted with every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    /// Stable caller-assigned id; determines the public artifact path.
    pub file_id: String,
    /// Id of this conversion; doubles as the queue job id.
    pub conversion_id: String,
    /// Uploaded source. Owned by the pipeline once the job starts.
    pub input_path: PathBuf,
    /// Original upload name, only used to recover the true extension.
    pub original_filename: String,
}

impl ConversionJob {
    pub fn new(
        file_id: impl Into<String>,
        conversion_id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        original_filename: impl Into<String>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            conversion_id: conversion_id.into(),
            input_path: input_path.into(),
            original_filename: original_filename.into(),
        }
    }

    /// Check that both ids are safe to use as path components.
    pub fn validate(&self) -> Result<(), QueueError> {
        validate_id("fileId", &self.file_id)?;
        validate_id("conversionId", &self.conversion_id)?;
        if self.input_path.as_os_str().is_empty() {
            return Err(QueueError::InvalidPayload(
                "inputPath must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_id(field: &str, value: &str) -> Result<(), QueueError> {
    if !ID_PATTERN.is_match(value) || value.contains("..") {
        return Err(QueueError::InvalidPayload(format!(
            "{field} {value:?} must match [A-Za-z0-9][A-Za-z0-9._-]*"
        )));
    }
    Ok(())
}

/// Delay policy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    /// `delay_ms * 2^(n-1)` before retry `n`.
    Exponential { delay_ms: u64 },
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
}

impl Backoff {
    /// Delay to wait after `attempts_made` failed attempts.
    pub fn delay_for(&self, attempts_made: u32) -> Duration {
        match *self {
            Backoff::Exponential { delay_ms } => {
                let exponent = attempts_made.saturating_sub(1).min(20);
                Duration::from_millis(delay_ms.saturating_mul(1u64 << exponent))
            }
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential { delay_ms: 2000 }
    }
}

/// Per-job queue options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Explicit job id; defaults to the payload's `conversionId`.
    pub job_id: Option<String>,
    /// Maximum number of attempts, including the first.
    pub attempts: u32,
    pub backoff: Backoff,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            job_id: None,
            attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 4] = [
        JobState::Pending,
        JobState::Active,
        JobState::Completed,
        JobState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(QueueError::Database(format!("unknown job state: {other}"))),
        }
    }
}

/// Terminal payload of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Public URL of the artifact.
    pub glb_url: String,
    /// Local path the artifact was published to. Kept even after remote upload.
    pub output_path: PathBuf,
    pub size_bytes: u64,
    /// Hex SHA-256 of the stored artifact.
    pub sha256: String,
    pub compressed: bool,
    pub storage: StorageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<GlbReport>,
}

/// A job as stored by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJob {
    pub id: String,
    pub kind: JobKind,
    pub payload: ConversionJob,
    pub state: JobState,
    pub progress: u8,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff: Backoff,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ConversionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl QueuedJob {
    /// Whether the attempt about to run (or running) is the last one allowed.
    pub fn is_final_attempt(&self) -> bool {
        self.attempts_made + 1 >= self.max_attempts
    }

    /// Status as exposed to pollers.
    pub fn status_view(&self) -> JobStatusView {
        match self.state {
            JobState::Pending => JobStatusView::Pending {
                progress: self.progress,
            },
            JobState::Active => JobStatusView::Processing {
                progress: self.progress,
            },
            JobState::Completed => JobStatusView::Completed {
                progress: 100,
                glb_url: self
                    .result
                    .as_ref()
                    .map(|r| r.glb_url.clone())
                    .unwrap_or_default(),
            },
            JobState::Failed => JobStatusView::Failed {
                error: self
                    .error
                    .clone()
                    .unwrap_or_else(|| "conversion failed".to_string()),
            },
        }
    }
}

/// Status contract returned by the polling endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatusView {
    Pending {
        progress: u8,
    },
    Processing {
        progress: u8,
    },
    Completed {
        progress: u8,
        #[serde(rename = "glbUrl")]
        glb_url: String,
    },
    Failed {
        error: String,
    },
}

/// Number of jobs per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounts {
    pub fn get(&self, state: JobState) -> u64 {
        match state {
            JobState::Pending => self.pending,
            JobState::Active => self.active,
            JobState::Completed => self.completed,
            JobState::Failed => self.failed,
        }
    }
}
