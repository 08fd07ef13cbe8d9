//! Draco geometry compression through gltf-pipeline.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use super::{CompressionOutcome, Compressor, CompressorConfig};

/// Runs the compression tool into a sibling file and swaps it in on success.
pub struct DracoCompressor {
    config: CompressorConfig,
}

impl DracoCompressor {
    pub fn new(config: CompressorConfig) -> Self {
        Self { config }
    }

    fn temp_output(path: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        path.with_file_name(format!("{stem}.draco.tmp.glb"))
    }

    async fn try_compress(&self, path: &Path, temp: &Path) -> Result<(u64, u64), String> {
        let original_bytes = tokio::fs::metadata(path)
            .await
            .map_err(|e| format!("cannot stat input: {e}"))?
            .len();

        let input = path.to_string_lossy();
        let output = temp.to_string_lossy();
        let args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect();

        let child = Command::new(&self.config.tool_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to launch {}: {e}", self.config.tool_path.display()))?;

        let result = timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| format!("timed out after {}s", self.config.timeout_secs))?
        .map_err(|e| e.to_string())?;

        if !result.status.success() {
            return Err(format!(
                "{}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ));
        }

        let compressed_bytes = match tokio::fs::metadata(temp).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err("tool produced no output".to_string()),
        };

        tokio::fs::rename(temp, path)
            .await
            .map_err(|e| format!("failed to replace original: {e}"))?;

        Ok((original_bytes, compressed_bytes))
    }
}

#[async_trait]
impl Compressor for DracoCompressor {
    fn name(&self) -> &str {
        "draco"
    }

    async fn compress(&self, path: &Path) -> CompressionOutcome {
        if !self.config.enabled {
            return CompressionOutcome::Disabled;
        }

        let temp = Self::temp_output(path);
        match self.try_compress(path, &temp).await {
            Ok((original_bytes, compressed_bytes)) => {
                info!(
                    path = %path.display(),
                    original_bytes,
                    compressed_bytes,
                    "Compressed GLB geometry"
                );
                CompressionOutcome::Compressed {
                    original_bytes,
                    compressed_bytes,
                }
            }
            Err(reason) => {
                let _ = tokio::fs::remove_file(&temp).await;
                warn!(path = %path.display(), reason = %reason, "Compression skipped");
                CompressionOutcome::Skipped { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_disabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.glb");
        std::fs::write(&path, b"original").unwrap();

        let compressor = DracoCompressor::new(CompressorConfig::default());
        assert_eq!(compressor.compress(&path).await, CompressionOutcome::Disabled);
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_missing_tool_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.glb");
        std::fs::write(&path, b"original").unwrap();

        let compressor = DracoCompressor::new(
            CompressorConfig::default()
                .enabled(true)
                .with_tool_path(dir.path().join("no-such-tool")),
        );
        let outcome = compressor.compress(&path).await;
        assert!(matches!(outcome, CompressionOutcome::Skipped { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::testing::write_fake_tool;

        #[tokio::test]
        async fn test_success_replaces_original() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("model.glb");
            std::fs::write(&path, b"original-and-long").unwrap();
            // gltf-pipeline -i IN -o OUT -d
            let tool = write_fake_tool(dir.path(), "gltf-pipeline", "echo small > \"$4\"");

            let compressor = DracoCompressor::new(
                CompressorConfig::default().enabled(true).with_tool_path(tool),
            );
            let outcome = compressor.compress(&path).await;

            assert_eq!(
                outcome,
                CompressionOutcome::Compressed {
                    original_bytes: 17,
                    compressed_bytes: 6
                }
            );
            assert_eq!(std::fs::read(&path).unwrap(), b"small\n");
            assert!(!DracoCompressor::temp_output(&path).exists());
        }

        #[tokio::test]
        async fn test_failure_keeps_original() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("model.glb");
            std::fs::write(&path, b"original").unwrap();
            let tool = write_fake_tool(
                dir.path(),
                "gltf-pipeline",
                "echo partial > \"$4\"\necho 'draco encoder crashed' >&2\nexit 1",
            );

            let compressor = DracoCompressor::new(
                CompressorConfig::default().enabled(true).with_tool_path(tool),
            );
            match compressor.compress(&path).await {
                CompressionOutcome::Skipped { reason } => {
                    assert!(reason.contains("draco encoder crashed"));
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert_eq!(std::fs::read(&path).unwrap(), b"original");
            assert!(!DracoCompressor::temp_output(&path).exists());
        }

        #[tokio::test]
        async fn test_empty_output_is_skipped() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("model.glb");
            std::fs::write(&path, b"original").unwrap();
            let tool = write_fake_tool(dir.path(), "gltf-pipeline", ": > \"$4\"");

            let compressor = DracoCompressor::new(
                CompressorConfig::default().enabled(true).with_tool_path(tool),
            );
            assert!(matches!(
                compressor.compress(&path).await,
                CompressionOutcome::Skipped { .. }
            ));
            assert_eq!(std::fs::read(&path).unwrap(), b"original");
        }
    }
}
