//! Tests against the built `glbforge` binary.

use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};

use glbforge_core::testing::{build_glb, sample_gltf_json};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// A config rooted in `data_dir`, polling fast enough for tests
fn minimal_config(port: u16, data_dir: &Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {port}

[queue]
database_path = "{db}"
poll_interval_ms = 20

[storage]
output_root = "{models}"
scratch_root = "{scratch}"
upload_root = "{uploads}"
"#,
        db = data_dir.join("queue.db").display(),
        models = data_dir.join("models").display(),
        scratch = data_dir.join("scratch").display(),
        uploads = data_dir.join("uploads").display(),
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

fn glbforge(config_path: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_glbforge"));
    command
        .env("GLBFORGE_CONFIG", config_path)
        .env("RUST_LOG", "error")
        .kill_on_drop(true);
    command
}

/// Run the binary to completion; it is expected to exit on its own
async fn run_to_exit(config_path: &Path) -> std::process::Output {
    timeout(Duration::from_secs(5), glbforge(config_path).output())
        .await
        .expect("Command timed out")
        .expect("Failed to execute command")
}

/// A running server and the directory holding its state
struct RunningServer {
    child: Child,
    port: u16,
    data_dir: TempDir,
    _config: NamedTempFile,
    client: Client,
}

impl RunningServer {
    async fn start() -> Self {
        let port = get_available_port();
        let data_dir = TempDir::new().unwrap();
        let config = write_config(&minimal_config(port, data_dir.path()));
        let child = glbforge(config.path())
            .spawn()
            .expect("Failed to spawn server");

        let server = Self {
            child,
            port,
            data_dir,
            _config: config,
            client: Client::new(),
        };
        assert!(server.wait_ready(100).await, "Server did not start in time");
        server
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    async fn wait_ready(&self, max_attempts: u32) -> bool {
        for _ in 0..max_attempts {
            if self.client.get(self.url("/api/v1/health")).send().await.is_ok() {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }
        false
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request");
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn stop(mut self) {
        self.child.kill().await.ok();
    }
}

#[tokio::test]
async fn test_health_reports_running_worker() {
    let server = RunningServer::start().await;

    let (status, body) = server.get_json("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["worker"]["running"], true);

    // The worker opened the queue store at startup
    assert!(server.data_dir.path().join("queue.db").exists());

    server.stop().await;
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let server = RunningServer::start().await;

    let (status, body) = server.get_json("/api/v1/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server"]["port"], server.port);
    assert_eq!(body["exporter"]["backend"], "sketchup");
    assert!(body["storage"].get("remote").is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_store_glb_over_http() {
    let server = RunningServer::start().await;

    let bytes = build_glb(&sample_gltf_json(0, 1, 0), None);
    // The server creates its upload root at startup
    let input = server.data_dir.path().join("uploads").join("upload.glb");
    std::fs::write(&input, &bytes).unwrap();

    let response = server
        .client
        .post(server.url("/api/v1/jobs"))
        .json(&json!({
            "type": "store-glb",
            "fileId": "file-1",
            "conversionId": "conv-1",
            "inputPath": input,
            "originalFilename": "scene.glb",
        }))
        .send()
        .await
        .expect("Failed to submit job");
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let mut last = Value::Null;
    for _ in 0..100 {
        let (_, body) = server.get_json("/api/v1/conversions/conv-1").await;
        if body["status"] == "completed" || body["status"] == "failed" {
            last = body;
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(last["status"], "completed", "last status: {}", last);
    assert_eq!(last["glbUrl"], "/models/file-1/model.glb");

    let artifact = server
        .client
        .get(server.url("/models/file-1/model.glb"))
        .send()
        .await
        .expect("Failed to fetch artifact");
    assert_eq!(artifact.status(), StatusCode::OK);
    assert_eq!(artifact.bytes().await.unwrap().as_ref(), bytes.as_slice());
    assert!(!input.exists());

    server.stop().await;
}

#[tokio::test]
async fn test_env_overrides_config_file() {
    let port = get_available_port();
    let data_dir = TempDir::new().unwrap();
    // The file names a port nobody listens on; the environment wins
    let config = write_config(&minimal_config(1, data_dir.path()));

    let mut child = glbforge(config.path())
        .env("GLBFORGE_SERVER__PORT", port.to_string())
        .spawn()
        .expect("Failed to spawn server");

    let client = Client::new();
    let mut ready = false;
    for _ in 0..100 {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            ready = true;
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert!(ready, "Server did not start on the overridden port");

    child.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = run_to_exit(Path::new("/nonexistent/config.toml")).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config(
        r#"
[server]
port = 8080

[queue]
concurrency = 0
"#,
    );

    let result = run_to_exit(config.path()).await;
    assert!(!result.status.success());
}
