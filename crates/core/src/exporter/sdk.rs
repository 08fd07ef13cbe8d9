//! Export through the headless SDK command-line exporter.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::info;

use super::strategy::{run_strategies, sidecar_dirs, StrategyRun};
use super::{ExportError, ExportOutput, ExportRequest, Exporter, ExporterConfig};

const TOOL: &str = "SketchUp SDK exporter";
const INTERCHANGE_EXTENSION: &str = "obj";

/// Exporter backed by a command-line tool linked against the authoring SDK.
///
/// The tool writes `model.obj`, `model.mtl` and a `model/` texture folder
/// into the output directory. Older builds take positional arguments, newer
/// ones take flags; both are tried.
pub struct SdkExporter {
    config: ExporterConfig,
}

impl SdkExporter {
    pub fn new(config: ExporterConfig) -> Self {
        Self { config }
    }

    fn program(&self) -> Result<&Path, ExportError> {
        self.config
            .sdk_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ExportError::tool_not_configured(TOOL))
    }
}

#[async_trait]
impl Exporter for SdkExporter {
    fn name(&self) -> &str {
        "sdk"
    }

    fn interchange_extension(&self) -> &str {
        INTERCHANGE_EXTENSION
    }

    async fn export(&self, request: ExportRequest) -> Result<ExportOutput, ExportError> {
        if !tokio::fs::try_exists(&request.input_path).await? {
            return Err(ExportError::InputMissing {
                path: request.input_path.clone(),
            });
        }
        let program = self.program()?;

        tokio::fs::create_dir_all(&request.output_dir).await?;
        let output_path = request
            .output_dir
            .join(format!("model.{INTERCHANGE_EXTENSION}"));

        info!(
            job_id = %request.job_id,
            input = %request.input_path.display(),
            "Exporting with SDK exporter"
        );
        let started = Instant::now();

        let vars = [
            ("input", request.input_path.as_path()),
            ("output_dir", request.output_dir.as_path()),
            ("output", output_path.as_path()),
        ];
        let run = StrategyRun {
            tool: TOOL,
            program,
            vars: &vars,
            timeout: Duration::from_secs(self.config.timeout_secs),
            working_dir: Some(&request.work_dir),
            expected_output: &output_path,
            log_path: None,
        };
        let strategy = run_strategies(&run, &self.config.sdk_strategies).await?;
        let texture_dirs = sidecar_dirs(&request.output_dir).await?;

        Ok(ExportOutput {
            interchange_path: output_path,
            texture_dirs,
            strategy,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), ExportError> {
        let program = self.program()?;
        if !tokio::fs::try_exists(program).await.unwrap_or(false) {
            return Err(ExportError::ToolNotFound {
                tool: TOOL.to_string(),
                path: program.to_path_buf(),
            });
        }
        Ok(())
    }
}
