//! Mock compressor for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::compressor::{CompressionOutcome, Compressor};

/// Records the files it is asked to compress and reports a fixed outcome.
/// The files themselves are never touched.
#[derive(Debug)]
pub struct MockCompressor {
    calls: Arc<RwLock<Vec<PathBuf>>>,
    outcome: Arc<RwLock<CompressionOutcome>>,
}

impl Default for MockCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompressor {
    /// Reports [`CompressionOutcome::Disabled`] until told otherwise.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            outcome: Arc::new(RwLock::new(CompressionOutcome::Disabled)),
        }
    }

    pub fn set_outcome(&self, outcome: CompressionOutcome) {
        if let Ok(mut current) = self.outcome.write() {
            *current = outcome;
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Compressor for MockCompressor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compress(&self, path: &Path) -> CompressionOutcome {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(path.to_path_buf());
        }
        self.outcome
            .read()
            .map(|o| o.clone())
            .unwrap_or(CompressionOutcome::Disabled)
    }
}
