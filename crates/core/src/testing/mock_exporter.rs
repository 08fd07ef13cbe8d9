//! Mock exporter for testing.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::exporter::{
    AttemptFailure, ExportError, ExportOutput, ExportRequest, Exporter, StrategyFailure,
};

/// Interchange file written by [`MockExporter`].
pub const MOCK_INTERCHANGE: &str = "<?xml version=\"1.0\"?><COLLADA version=\"1.4.1\"/>";

/// Mock implementation of the Exporter trait.
///
/// A successful export writes `model.dae` and a `model/tex.png` side-car
/// texture into the request's output directory, like the authoring
/// application does.
#[derive(Debug)]
pub struct MockExporter {
    /// Recorded export requests.
    requests: Arc<RwLock<Vec<ExportRequest>>>,
    /// If set, the next export fails with this error.
    next_error: Arc<RwLock<Option<ExportError>>>,
    /// Exports still to fail as if every strategy had failed.
    failures_remaining: Arc<RwLock<usize>>,
}

impl Default for MockExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExporter {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failures_remaining: Arc::new(RwLock::new(0)),
        }
    }

    pub fn recorded_requests(&self) -> Vec<ExportRequest> {
        self.requests.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn set_next_error(&self, error: ExportError) {
        if let Ok(mut next) = self.next_error.write() {
            *next = Some(error);
        }
    }

    /// Fail the next `count` exports.
    pub fn fail_next(&self, count: usize) {
        if let Ok(mut remaining) = self.failures_remaining.write() {
            *remaining = count;
        }
    }

    fn take_error(&self) -> Option<ExportError> {
        if let Some(err) = self.next_error.write().ok().and_then(|mut e| e.take()) {
            return Some(err);
        }
        let mut remaining = self.failures_remaining.write().ok()?;
        if *remaining > 0 {
            *remaining -= 1;
            return Some(ExportError::AllStrategiesFailed {
                failures: vec![StrategyFailure {
                    strategy: "mock".to_string(),
                    failure: AttemptFailure::Exited {
                        code: "1".to_string(),
                        stderr: "simulated".to_string(),
                    },
                }],
            });
        }
        None
    }
}

#[async_trait]
impl Exporter for MockExporter {
    fn name(&self) -> &str {
        "mock"
    }

    fn interchange_extension(&self) -> &str {
        "dae"
    }

    async fn export(&self, request: ExportRequest) -> Result<ExportOutput, ExportError> {
        if let Ok(mut requests) = self.requests.write() {
            requests.push(request.clone());
        }

        if let Some(err) = self.take_error() {
            return Err(err);
        }

        if !tokio::fs::try_exists(&request.input_path).await? {
            return Err(ExportError::InputMissing {
                path: request.input_path,
            });
        }

        let textures = request.output_dir.join("model");
        tokio::fs::create_dir_all(&textures).await?;
        tokio::fs::write(textures.join("tex.png"), b"\x89PNG").await?;
        let interchange_path = request.output_dir.join("model.dae");
        tokio::fs::write(&interchange_path, MOCK_INTERCHANGE).await?;

        Ok(ExportOutput {
            interchange_path,
            texture_dirs: vec![textures],
            strategy: "mock".to_string(),
            duration_ms: 0,
        })
    }

    async fn validate(&self) -> Result<(), ExportError> {
        Ok(())
    }
}
