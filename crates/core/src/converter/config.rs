//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the mesh converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to the converter binary.
    #[serde(default = "default_converter_path")]
    pub converter_path: PathBuf,

    /// Argument template; `{input}` and `{output}` are substituted.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Timeout for a single conversion in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_converter_path() -> PathBuf {
    PathBuf::from("assimp")
}

fn default_args() -> Vec<String> {
    vec![
        "export".to_string(),
        "{input}".to_string(),
        "{output}".to_string(),
    ]
}

fn default_timeout() -> u64 {
    600
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            converter_path: default_converter_path(),
            args: default_args(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ConverterConfig {
    /// Sets the converter binary path.
    pub fn with_converter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.converter_path = path.into();
        self
    }

    /// Sets the argument template.
    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
