//! Mock mesh converter for testing.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tokio::sync::Semaphore;

use crate::converter::{ConverterError, MeshConversionJob, MeshConversionResult, MeshConverter};

use super::fixtures::{build_glb, sample_gltf_json};

/// Mock implementation of the MeshConverter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Fail the next N conversions, or the next one with a specific error
/// - Control the bytes written as output
/// - Hold conversions in flight until the test releases them
///
/// # Example
///
/// ```rust,ignore
/// use glbforge_core::testing::MockMeshConverter;
///
/// let converter = MockMeshConverter::new();
/// converter.fail_next(2);
///
/// assert!(converter.convert(job.clone()).await.is_err());
/// assert!(converter.convert(job.clone()).await.is_err());
/// assert!(converter.convert(job).await.is_ok());
/// assert_eq!(converter.recorded_jobs().len(), 3);
/// ```
#[derive(Debug)]
pub struct MockMeshConverter {
    /// Recorded conversion jobs.
    jobs: Arc<RwLock<Vec<MeshConversionJob>>>,
    /// If set, the next conversion fails with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Conversions still to fail with a generic error.
    failures_remaining: Arc<RwLock<usize>>,
    /// Bytes written to the output path. A small valid GLB when unset.
    output: Arc<RwLock<Option<Vec<u8>>>>,
    /// When set, each conversion takes a permit from here before it runs.
    gate: Arc<RwLock<Option<Arc<Semaphore>>>>,
}

impl Default for MockMeshConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMeshConverter {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failures_remaining: Arc::new(RwLock::new(0)),
            output: Arc::new(RwLock::new(None)),
            gate: Arc::new(RwLock::new(None)),
        }
    }

    /// All conversion jobs received so far, failed ones included.
    pub fn recorded_jobs(&self) -> Vec<MeshConversionJob> {
        self.jobs.read().map(|j| j.clone()).unwrap_or_default()
    }

    /// Configure the next conversion to fail with the given error.
    pub fn set_next_error(&self, error: ConverterError) {
        if let Ok(mut next) = self.next_error.write() {
            *next = Some(error);
        }
    }

    /// Fail the next `count` conversions.
    pub fn fail_next(&self, count: usize) {
        if let Ok(mut remaining) = self.failures_remaining.write() {
            *remaining = count;
        }
    }

    /// Write these bytes instead of the default GLB.
    pub fn set_output(&self, bytes: Vec<u8>) {
        if let Ok(mut output) = self.output.write() {
            *output = Some(bytes);
        }
    }

    /// Hold every conversion until `gate` hands out a permit for it.
    pub fn set_gate(&self, gate: Arc<Semaphore>) {
        if let Ok(mut current) = self.gate.write() {
            *current = Some(gate);
        }
    }

    fn take_error(&self) -> Option<ConverterError> {
        if let Some(err) = self.next_error.write().ok().and_then(|mut e| e.take()) {
            return Some(err);
        }
        let mut remaining = self.failures_remaining.write().ok()?;
        if *remaining > 0 {
            *remaining -= 1;
            return Some(ConverterError::conversion_failed(
                "mock converter failure",
                Some("simulated".to_string()),
            ));
        }
        None
    }

    fn output_bytes(&self) -> Vec<u8> {
        self.output
            .read()
            .ok()
            .and_then(|o| o.clone())
            .unwrap_or_else(|| build_glb(&sample_gltf_json(1, 1, 1), Some(&[0u8; 8])))
    }
}

#[async_trait]
impl MeshConverter for MockMeshConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(
        &self,
        job: MeshConversionJob,
    ) -> Result<MeshConversionResult, ConverterError> {
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.push(job.clone());
        }

        let gate = self.gate.read().ok().and_then(|g| g.clone());
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if let Some(err) = self.take_error() {
            return Err(err);
        }

        if !tokio::fs::try_exists(&job.input_path).await? {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = self.output_bytes();
        tokio::fs::write(&job.output_path, &bytes).await?;

        Ok(MeshConversionResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: bytes.len() as u64,
            duration_ms: 0,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job(dir: &TempDir) -> MeshConversionJob {
        let input = dir.path().join("model.dae");
        std::fs::write(&input, "<COLLADA/>").unwrap();
        MeshConversionJob {
            job_id: "job-1".to_string(),
            input_path: input,
            output_path: dir.path().join("out").join("model.glb"),
            working_dir: dir.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_writes_valid_glb() {
        let dir = TempDir::new().unwrap();
        let converter = MockMeshConverter::new();
        let result = converter.convert(job(&dir)).await.unwrap();

        let bytes = std::fs::read(&result.output_path).unwrap();
        assert_eq!(result.output_size_bytes, bytes.len() as u64);
        assert!(crate::validator::inspect_glb(&bytes).is_ok());
    }

    #[tokio::test]
    async fn test_fail_next_counts_down() {
        let dir = TempDir::new().unwrap();
        let converter = MockMeshConverter::new();
        converter.fail_next(2);

        assert!(converter.convert(job(&dir)).await.is_err());
        assert!(converter.convert(job(&dir)).await.is_err());
        assert!(converter.convert(job(&dir)).await.is_ok());
        assert_eq!(converter.recorded_jobs().len(), 3);
    }

    #[tokio::test]
    async fn test_gate_holds_conversion() {
        let dir = TempDir::new().unwrap();
        let converter = Arc::new(MockMeshConverter::new());
        let gate = Arc::new(Semaphore::new(0));
        converter.set_gate(Arc::clone(&gate));

        let task = {
            let converter = Arc::clone(&converter);
            let job = job(&dir);
            tokio::spawn(async move { converter.convert(job).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!task.is_finished());
        assert_eq!(converter.recorded_jobs().len(), 1);

        gate.add_permits(1);
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_next_error_is_used_once() {
        let dir = TempDir::new().unwrap();
        let converter = MockMeshConverter::new();
        converter.set_next_error(ConverterError::Timeout { timeout_secs: 5 });

        assert!(matches!(
            converter.convert(job(&dir)).await,
            Err(ConverterError::Timeout { timeout_secs: 5 })
        ));
        assert!(converter.convert(job(&dir)).await.is_ok());
    }
}
