//! Error types for the exporter module.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single invocation strategy did not produce an export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error("failed to launch: {reason}")]
    Launch { reason: String },

    #[error("exited with {code}: {stderr}")]
    Exited { code: String, stderr: String },

    #[error("timed out after {timeout_secs}s")]
    TimedOut { timeout_secs: u64 },

    /// Clean exit, but the expected file was never written.
    #[error("exited cleanly but {path} is missing; log: {log}")]
    OutputMissing { path: PathBuf, log: String },
}

/// One strategy and how it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub failure: AttemptFailure,
}

impl std::fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.strategy, self.failure)
    }
}

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Source file does not exist.
    #[error("Input file not found: {path}")]
    InputMissing { path: PathBuf },

    /// No executable configured for the selected backend.
    #[error("{tool} path is not configured")]
    ToolNotConfigured { tool: String },

    /// Configured executable does not exist.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: String, path: PathBuf },

    /// No strategy configured to try.
    #[error("No invocation strategies configured for {tool}")]
    NoStrategies { tool: String },

    /// Every invocation strategy failed.
    #[error("All {} invocation strategies failed: {}", .failures.len(), join_failures(.failures))]
    AllStrategiesFailed { failures: Vec<StrategyFailure> },

    /// The automation script could not be written.
    #[error("Failed to write automation script {path}: {source}")]
    ScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ExportError {
    pub fn tool_not_configured(tool: impl Into<String>) -> Self {
        Self::ToolNotConfigured { tool: tool.into() }
    }

    /// Whether this error can never be fixed by retrying the same job.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::InputMissing { .. })
    }
}
