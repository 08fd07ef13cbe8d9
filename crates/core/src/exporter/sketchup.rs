//! Export through the authoring application.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use super::script::render_export_script;
use super::strategy::{remove_if_exists, run_strategies, sidecar_dirs, StrategyRun};
use super::{ExportError, ExportOutput, ExportRequest, Exporter, ExporterConfig};

const TOOL: &str = "SketchUp";
const INTERCHANGE_EXTENSION: &str = "dae";

/// Exporter that launches the authoring application with a startup script.
///
/// The document path is handed over on the command line and the script runs
/// at startup, so no template chooser or welcome dialog is shown. The script
/// exports COLLADA, closes the document without saving and quits.
pub struct SketchupExporter {
    config: ExporterConfig,
}

impl SketchupExporter {
    pub fn new(config: ExporterConfig) -> Self {
        Self { config }
    }

    fn program(&self) -> Result<&Path, ExportError> {
        self.config
            .sketchup_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ExportError::tool_not_configured(TOOL))
    }

    fn helper_paths(request: &ExportRequest) -> (PathBuf, PathBuf) {
        let stem = format!("glbforge_export_{}", request.job_id);
        (
            request.work_dir.join(format!("{stem}.rb")),
            request.work_dir.join(format!("{stem}.log")),
        )
    }

    async fn run(
        &self,
        program: &Path,
        request: &ExportRequest,
        output_path: &Path,
        script_path: &Path,
        log_path: &Path,
    ) -> Result<String, ExportError> {
        let script = render_export_script(&request.job_id, output_path, log_path);
        tokio::fs::write(script_path, script)
            .await
            .map_err(|e| ExportError::ScriptWrite {
                path: script_path.to_path_buf(),
                source: e,
            })?;

        let vars = [
            ("script", script_path),
            ("input", request.input_path.as_path()),
            ("output", output_path),
            ("log", log_path),
        ];
        let run = StrategyRun {
            tool: TOOL,
            program,
            vars: &vars,
            timeout: Duration::from_secs(self.config.timeout_secs),
            working_dir: Some(&request.work_dir),
            expected_output: output_path,
            log_path: Some(log_path),
        };
        run_strategies(&run, &self.config.sketchup_strategies).await
    }
}

#[async_trait]
impl Exporter for SketchupExporter {
    fn name(&self) -> &str {
        "sketchup"
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
        let (script_path, log_path) = Self::helper_paths(&request);

        info!(
            job_id = %request.job_id,
            input = %request.input_path.display(),
            "Exporting with SketchUp"
        );
        let started = Instant::now();
        let result = self
            .run(program, &request, &output_path, &script_path, &log_path)
            .await;

        for helper in [&script_path, &log_path] {
            if let Err(e) = remove_if_exists(helper).await {
                warn!(path = %helper.display(), error = %e, "Failed to remove export helper file");
            }
        }

        let strategy = result?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(dir: &TempDir) -> ExportRequest {
        let input = dir.path().join("source.skp");
        std::fs::write(&input, b"skp").unwrap();
        ExportRequest {
            job_id: "conv-1".to_string(),
            input_path: input,
            work_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("export"),
        }
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let exporter = SketchupExporter::new(ExporterConfig::default().with_sketchup_path("/x"));
        let mut req = request(&dir);
        req.input_path = dir.path().join("missing.skp");
        let err = exporter.export(req).await.unwrap_err();
        assert!(matches!(err, ExportError::InputMissing { .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_path() {
        let dir = TempDir::new().unwrap();
        let exporter = SketchupExporter::new(ExporterConfig::default());
        let err = exporter.export(request(&dir)).await.unwrap_err();
        assert!(matches!(err, ExportError::ToolNotConfigured { .. }));
        assert!(matches!(
            exporter.validate().await,
            Err(ExportError::ToolNotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_missing_binary() {
        let exporter = SketchupExporter::new(
            ExporterConfig::default().with_sketchup_path("/nonexistent/SketchUp"),
        );
        assert!(matches!(
            exporter.validate().await,
            Err(ExportError::ToolNotFound { .. })
        ));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::exporter::InvocationStrategy;
        use crate::testing::write_fake_tool;

        /// Reads `output_path` out of the startup script like the real
        /// application would, then writes a DAE and a texture folder.
        const FAKE_SKETCHUP: &str = r#"script=""
while [ $# -gt 0 ]; do
  case "$1" in
    -RubyStartup) script="$2"; shift 2 ;;
    *) shift ;;
  esac
done
[ -z "$script" ] && { echo "no startup script" >&2; exit 2; }
out=$(sed -n "s/^output_path = '\(.*\)'$/\1/p" "$script")
log=$(sed -n "s/^log_path = '\(.*\)'$/\1/p" "$script")
echo "[glbforge] BEGIN" >> "$log"
mkdir -p "$(dirname "$out")/model"
echo png > "$(dirname "$out")/model/brick.png"
echo '<COLLADA/>' > "$out"
echo "[glbforge] QUIT" >> "$log"
"#;

        #[tokio::test]
        async fn test_export_with_fake_application() {
            let dir = TempDir::new().unwrap();
            let tool = write_fake_tool(dir.path(), "SketchUp", FAKE_SKETCHUP);
            let exporter =
                SketchupExporter::new(ExporterConfig::default().with_sketchup_path(&tool));
            let req = request(&dir);

            let output = exporter.export(req.clone()).await.unwrap();
            assert_eq!(output.strategy, "ruby-startup");
            assert_eq!(output.interchange_path, req.output_dir.join("model.dae"));
            assert!(output.interchange_path.exists());
            assert_eq!(output.texture_dirs, vec![req.output_dir.join("model")]);

            // Helper files removed after the run
            let (script, log) = SketchupExporter::helper_paths(&req);
            assert!(!script.exists());
            assert!(!log.exists());
        }

        #[tokio::test]
        async fn test_all_strategies_fail_and_helpers_removed() {
            let dir = TempDir::new().unwrap();
            let tool = write_fake_tool(dir.path(), "SketchUp", "echo 'license expired' >&2\nexit 1");
            let exporter = SketchupExporter::new(
                ExporterConfig::default()
                    .with_sketchup_path(&tool)
                    .with_sketchup_strategies(vec![
                        InvocationStrategy::new("a", &["-RubyStartup", "{script}", "{input}"]),
                        InvocationStrategy::new("b", &["{input}", "-RubyStartup", "{script}"]),
                    ]),
            );
            let req = request(&dir);

            let err = exporter.export(req.clone()).await.unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("[a]"));
            assert!(msg.contains("[b]"));
            assert!(msg.contains("license expired"));

            let (script, log) = SketchupExporter::helper_paths(&req);
            assert!(!script.exists());
            assert!(!log.exists());
        }
    }
}
