//! Mesh converter backed by the assimp command-line tool.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::MeshConverter;
use super::types::{MeshConversionJob, MeshConversionResult};

/// Converter that shells out to `assimp export`.
pub struct AssimpConverter {
    config: ConverterConfig,
}

impl AssimpConverter {
    /// Creates a new converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a new converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    fn build_args(&self, job: &MeshConversionJob) -> Vec<String> {
        let input = job.input_path.to_string_lossy();
        let output = job.output_path.to_string_lossy();
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl MeshConverter for AssimpConverter {
    fn name(&self) -> &str {
        "assimp"
    }

    async fn convert(
        &self,
        job: MeshConversionJob,
    ) -> Result<MeshConversionResult, ConverterError> {
        if !tokio::fs::try_exists(&job.input_path).await? {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(&job);
        info!(
            job_id = %job.job_id,
            input = %job.input_path.display(),
            output = %job.output_path.display(),
            working_dir = %job.working_dir.display(),
            "Starting mesh conversion"
        );
        debug!(job_id = %job.job_id, ?args, "assimp arguments");

        let started = Instant::now();
        let child = Command::new(&self.config.converter_path)
            .args(&args)
            .current_dir(&job.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::ConverterNotFound {
                        path: self.config.converter_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            // The child is killed when the dropped future drops it.
            Err(_) => {
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            // assimp reports most errors on stdout
            let detail = if stderr.is_empty() { stdout } else { stderr };
            return Err(ConverterError::conversion_failed(
                format!("assimp {}", output.status),
                (!detail.is_empty()).then_some(detail),
            ));
        }

        let output_size_bytes = match tokio::fs::metadata(&job.output_path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
            _ => {
                return Err(ConverterError::OutputMissing {
                    path: job.output_path.clone(),
                })
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            job_id = %job.job_id,
            output_size_bytes,
            duration_ms,
            "Mesh conversion finished"
        );

        Ok(MeshConversionResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes,
            duration_ms,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let result = Command::new(&self.config.converter_path)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConverterError::ConverterNotFound {
                    path: self.config.converter_path.clone(),
                })
            }
            Err(e) => Err(ConverterError::Io(e)),
        }
    }
}
