//! Configuration for the optional compression step.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for geometry compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressorConfig {
    /// Off unless explicitly enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Path to the compression tool.
    #[serde(default = "default_tool_path")]
    pub tool_path: PathBuf,

    /// Argument template; `{input}` and `{output}` are substituted.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_tool_path() -> PathBuf {
    PathBuf::from("gltf-pipeline")
}

fn default_args() -> Vec<String> {
    ["-i", "{input}", "-o", "{output}", "-d"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout() -> u64 {
    300
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tool_path: default_tool_path(),
            args: default_args(),
            timeout_secs: default_timeout(),
        }
    }
}

impl CompressorConfig {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
