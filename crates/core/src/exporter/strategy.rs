//! Ordered argument-template fallback for brittle command-line tools.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{AttemptFailure, ExportError, StrategyFailure};

/// Captured output is cut to this many trailing characters.
const MAX_CAPTURE_CHARS: usize = 2000;

/// One way of invoking a tool: a name and an argument template.
///
/// Arguments may contain `{placeholder}` tokens which are replaced by
/// [`InvocationStrategy::render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationStrategy {
    pub name: String,
    pub args: Vec<String>,
}

impl InvocationStrategy {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Substitute `{key}` tokens with their paths.
    pub fn render(&self, vars: &[(&str, &Path)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (key, value)| {
                    acc.replace(&format!("{{{key}}}"), &value.to_string_lossy())
                })
            })
            .collect()
    }
}

/// What a strategy run needs besides the strategies themselves.
#[derive(Debug, Clone)]
pub struct StrategyRun<'a> {
    /// Tool name, for messages.
    pub tool: &'a str,
    pub program: &'a Path,
    pub vars: &'a [(&'a str, &'a Path)],
    pub timeout: Duration,
    pub working_dir: Option<&'a Path>,
    /// File whose presence after a clean exit marks success.
    pub expected_output: &'a Path,
    /// Log written by the tool, quoted when the output is missing.
    pub log_path: Option<&'a Path>,
}

/// Try each strategy in order and return the name of the first one that
/// exited cleanly and left `expected_output` behind.
pub async fn run_strategies(
    run: &StrategyRun<'_>,
    strategies: &[InvocationStrategy],
) -> Result<String, ExportError> {
    if strategies.is_empty() {
        return Err(ExportError::NoStrategies {
            tool: run.tool.to_string(),
        });
    }

    let mut failures = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        // Stale output from an earlier attempt must not count as success.
        remove_if_exists(run.expected_output).await?;
        if let Some(log) = run.log_path {
            remove_if_exists(log).await?;
        }

        match run_once(run, strategy).await {
            Ok(()) => {
                info!(
                    tool = run.tool,
                    strategy = %strategy.name,
                    output = %run.expected_output.display(),
                    "Invocation strategy succeeded"
                );
                return Ok(strategy.name.clone());
            }
            Err(failure) => {
                warn!(
                    tool = run.tool,
                    strategy = %strategy.name,
                    error = %failure,
                    "Invocation strategy failed"
                );
                failures.push(StrategyFailure {
                    strategy: strategy.name.clone(),
                    failure,
                });
            }
        }
    }

    Err(ExportError::AllStrategiesFailed { failures })
}

async fn run_once(run: &StrategyRun<'_>, strategy: &InvocationStrategy) -> Result<(), AttemptFailure> {
    let args = strategy.render(run.vars);
    debug!(tool = run.tool, program = %run.program.display(), ?args, "Running tool");

    let mut cmd = Command::new(run.program);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = run.working_dir {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|e| AttemptFailure::Launch {
        reason: format!("{}: {}", run.program.display(), e),
    })?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = match timeout(run.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(AttemptFailure::Launch {
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(AttemptFailure::TimedOut {
                timeout_secs: run.timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AttemptFailure::Exited {
            code: output.status.to_string(),
            stderr: tail(stderr.trim()),
        });
    }

    if !is_non_empty_file(run.expected_output).await {
        let log = match run.log_path {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map(|s| tail(s.trim()))
                .unwrap_or_else(|_| "<no log written>".to_string()),
            None => tail(String::from_utf8_lossy(&output.stdout).trim()),
        };
        return Err(AttemptFailure::OutputMissing {
            path: run.expected_output.to_path_buf(),
            log,
        });
    }

    Ok(())
}

pub(crate) async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

pub(crate) async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Directories directly inside `dir`; exporters put texture folders there.
pub(crate) async fn sidecar_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn tail(s: &str) -> String {
    let count = s.chars().count();
    if count <= MAX_CAPTURE_CHARS {
        return s.to_string();
    }
    let skipped: String = s.chars().skip(count - MAX_CAPTURE_CHARS).collect();
    format!("...{skipped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let strategy = InvocationStrategy::new("s", &["-RubyStartup", "{script}", "{input}"]);
        let args = strategy.render(&[
            ("script", Path::new("/tmp/job/export.rb")),
            ("input", Path::new("/tmp/job/source.skp")),
        ]);
        assert_eq!(
            args,
            vec!["-RubyStartup", "/tmp/job/export.rb", "/tmp/job/source.skp"]
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let strategy = InvocationStrategy::new("s", &["--out={output}", "{other}"]);
        let args = strategy.render(&[("output", Path::new("a.glb"))]);
        assert_eq!(args, vec!["--out=a.glb", "{other}"]);
    }

    #[test]
    fn test_tail_truncates() {
        let long = "x".repeat(MAX_CAPTURE_CHARS + 10);
        let cut = tail(&long);
        assert!(cut.starts_with("..."));
        assert_eq!(cut.len(), MAX_CAPTURE_CHARS + 3);
        assert_eq!(tail("short"), "short");
    }

    #[tokio::test]
    async fn test_no_strategies() {
        let run = StrategyRun {
            tool: "tool",
            program: Path::new("/bin/true"),
            vars: &[],
            timeout: Duration::from_secs(1),
            working_dir: None,
            expected_output: Path::new("/nonexistent/out"),
            log_path: None,
        };
        let err = run_strategies(&run, &[]).await.unwrap_err();
        assert!(matches!(err, ExportError::NoStrategies { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::testing::write_fake_tool;
        use tempfile::TempDir;

        fn strategies() -> Vec<InvocationStrategy> {
            vec![
                InvocationStrategy::new("first", &["first", "{output}"]),
                InvocationStrategy::new("second", &["second", "{output}"]),
            ]
        }

        #[tokio::test]
        async fn test_falls_through_to_working_strategy() {
            let dir = TempDir::new().unwrap();
            // Only the "second" form writes the output.
            let tool = write_fake_tool(
                dir.path(),
                "tool",
                r#"if [ "$1" = "second" ]; then echo data > "$2"; exit 0; fi
echo "unknown flag" >&2
exit 3"#,
            );
            let output = dir.path().join("out.dae");
            let vars = [("output", output.as_path())];
            let run = StrategyRun {
                tool: "tool",
                program: &tool,
                vars: &vars,
                timeout: Duration::from_secs(10),
                working_dir: Some(dir.path()),
                expected_output: &output,
                log_path: None,
            };

            let winner = run_strategies(&run, &strategies()).await.unwrap();
            assert_eq!(winner, "second");
            assert!(output.exists());
        }

        #[tokio::test]
        async fn test_clean_exit_without_output_cites_log() {
            let dir = TempDir::new().unwrap();
            let log = dir.path().join("export.log");
            let tool = write_fake_tool(
                dir.path(),
                "tool",
                &format!("echo 'EXPORT result=false' >> '{}'\nexit 0", log.display()),
            );
            let output = dir.path().join("out.dae");
            let vars = [("output", output.as_path())];
            let run = StrategyRun {
                tool: "tool",
                program: &tool,
                vars: &vars,
                timeout: Duration::from_secs(10),
                working_dir: None,
                expected_output: &output,
                log_path: Some(&log),
            };

            let err = run_strategies(&run, &strategies()[..1]).await.unwrap_err();
            match err {
                ExportError::AllStrategiesFailed { failures } => {
                    assert_eq!(failures.len(), 1);
                    match &failures[0].failure {
                        AttemptFailure::OutputMissing { log, .. } => {
                            assert!(log.contains("EXPORT result=false"));
                        }
                        other => panic!("unexpected failure: {other:?}"),
                    }
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_timeout_kills_and_falls_through() {
            let dir = TempDir::new().unwrap();
            let tool = write_fake_tool(dir.path(), "tool", "sleep 30");
            let output = dir.path().join("out.dae");
            let vars = [("output", output.as_path())];
            let run = StrategyRun {
                tool: "tool",
                program: &tool,
                vars: &vars,
                timeout: Duration::from_millis(200),
                working_dir: None,
                expected_output: &output,
                log_path: None,
            };

            let started = std::time::Instant::now();
            let err = run_strategies(&run, &strategies()).await.unwrap_err();
            assert!(started.elapsed() < Duration::from_secs(10));
            match err {
                ExportError::AllStrategiesFailed { failures } => {
                    assert_eq!(failures.len(), 2);
                    assert!(failures
                        .iter()
                        .all(|f| matches!(f.failure, AttemptFailure::TimedOut { .. })));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_stale_output_is_not_success() {
            let dir = TempDir::new().unwrap();
            let tool = write_fake_tool(dir.path(), "tool", "exit 0");
            let output = dir.path().join("out.dae");
            std::fs::write(&output, "left over from a previous attempt").unwrap();
            let vars = [("output", output.as_path())];
            let run = StrategyRun {
                tool: "tool",
                program: &tool,
                vars: &vars,
                timeout: Duration::from_secs(10),
                working_dir: None,
                expected_output: &output,
                log_path: None,
            };

            assert!(run_strategies(&run, &strategies()).await.is_err());
        }

        #[tokio::test]
        async fn test_missing_program_is_launch_failure() {
            let dir = TempDir::new().unwrap();
            let output = dir.path().join("out.dae");
            let missing = dir.path().join("no-such-tool");
            let run = StrategyRun {
                tool: "tool",
                program: &missing,
                vars: &[],
                timeout: Duration::from_secs(1),
                working_dir: None,
                expected_output: &output,
                log_path: None,
            };
            let err = run_strategies(&run, &strategies()[..1]).await.unwrap_err();
            assert!(err.to_string().contains("failed to launch"));
        }
    }
}
