//! Configuration for the export stage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::InvocationStrategy;

/// Which exporter drives proprietary sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExporterBackend {
    /// The authoring application, scripted through a startup Ruby file.
    #[default]
    Sketchup,
    /// A headless command-line exporter built on the authoring SDK.
    Sdk,
}

/// Configuration for the export stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub backend: ExporterBackend,

    /// Path to the authoring application executable.
    #[serde(default)]
    pub sketchup_path: Option<PathBuf>,

    /// Path to the SDK exporter executable.
    #[serde(default)]
    pub sdk_path: Option<PathBuf>,

    /// Wall-clock limit per invocation.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Argument templates tried in order against the authoring application.
    #[serde(default = "default_sketchup_strategies")]
    pub sketchup_strategies: Vec<InvocationStrategy>,

    /// Argument templates tried in order against the SDK exporter.
    #[serde(default = "default_sdk_strategies")]
    pub sdk_strategies: Vec<InvocationStrategy>,
}

fn default_timeout() -> u64 {
    300
}

pub(crate) fn default_sketchup_strategies() -> Vec<InvocationStrategy> {
    vec![
        InvocationStrategy::new("ruby-startup", &["-RubyStartup", "{script}", "{input}"]),
        InvocationStrategy::new(
            "input-first",
            &["{input}", "-RubyStartup", "{script}"],
        ),
        InvocationStrategy::new(
            "ruby-startup-lowercase",
            &["-rubystartup", "{script}", "{input}"],
        ),
    ]
}

pub(crate) fn default_sdk_strategies() -> Vec<InvocationStrategy> {
    vec![
        InvocationStrategy::new("positional", &["{input}", "{output_dir}", "obj"]),
        InvocationStrategy::new(
            "flags",
            &[
                "--input",
                "{input}",
                "--outputDir",
                "{output_dir}",
                "--format",
                "obj",
            ],
        ),
    ]
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            backend: ExporterBackend::default(),
            sketchup_path: None,
            sdk_path: None,
            timeout_secs: default_timeout(),
            sketchup_strategies: default_sketchup_strategies(),
            sdk_strategies: default_sdk_strategies(),
        }
    }
}

impl ExporterConfig {
    pub fn with_sketchup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sketchup_path = Some(path.into());
        self
    }

    pub fn with_sdk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backend = ExporterBackend::Sdk;
        self.sdk_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_sketchup_strategies(mut self, strategies: Vec<InvocationStrategy>) -> Self {
        self.sketchup_strategies = strategies;
        self
    }
}
