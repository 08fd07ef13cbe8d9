//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock tool adapters and an in-memory queue, enabling end-to-end
//! testing without SketchUp, assimp or a remote store.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use glbforge_core::{
    testing::{build_glb, sample_gltf_json, MockCompressor, MockExporter, MockMeshConverter},
    Config, ConversionPipeline, JobWorker, QueueClient, QueueConfig, StorageConfig,
    StorageResolver,
};
use glbforge_server::{api::create_router, state::AppState};

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Export (MockExporter)
/// - Mesh conversion (MockMeshConverter)
/// - Compression (MockCompressor)
///
/// The worker is created but not started; call [`TestFixture::start_worker`]
/// for tests that need jobs to run.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///     let input = fixture.write_input("upload-1", b"skp");
///
///     let response = fixture.post("/api/v1/jobs", fixture.job_body(
///         "convert-skp-to-glb", "file-1", "conv-1", &input, "house.skp",
///     )).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub queue: Arc<QueueClient>,
    pub worker: Arc<JobWorker>,
    pub exporter: Arc<MockExporter>,
    pub converter: Arc<MockMeshConverter>,
    pub compressor: Arc<MockCompressor>,
    /// Temporary directory holding uploads, scratch and output roots
    pub temp_dir: TempDir,
    pub output_root: PathBuf,
    pub scratch_root: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture in local storage mode.
    pub async fn new() -> Self {
        Self::with_storage(|storage| storage).await
    }

    /// Create a test fixture, adjusting the storage config first.
    pub async fn with_storage(adjust: impl FnOnce(StorageConfig) -> StorageConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output_root = temp_dir.path().join("models");
        let scratch_root = temp_dir.path().join("scratch");
        std::fs::create_dir_all(temp_dir.path().join("uploads"))
            .expect("Failed to create uploads dir");

        let mut config = Config::default();
        config.server.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.queue = QueueConfig::in_memory()
            .with_attempts(3)
            .with_backoff_delay_ms(10)
            .with_poll_interval_ms(20)
            .with_concurrency(2);
        config.storage = adjust(
            StorageConfig::local(&output_root, &scratch_root)
                .with_upload_root(temp_dir.path().join("uploads")),
        );

        let queue = Arc::new(QueueClient::new(config.queue.clone()));

        let exporter = Arc::new(MockExporter::new());
        let converter = Arc::new(MockMeshConverter::new());
        let compressor = Arc::new(MockCompressor::new());
        let storage = Arc::new(
            StorageResolver::new(config.storage.clone()).expect("Failed to create storage"),
        );

        let pipeline = Arc::new(ConversionPipeline::new(
            exporter.clone(),
            converter.clone(),
            compressor.clone(),
            storage,
        ));
        let worker = Arc::new(JobWorker::new(Arc::clone(&queue), Arc::clone(&pipeline)));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&queue),
            pipeline,
            Arc::clone(&worker),
        ));
        let router = create_router(state);

        Self {
            router,
            queue,
            worker,
            exporter,
            converter,
            compressor,
            temp_dir,
            output_root,
            scratch_root,
        }
    }

    pub async fn start_worker(&self) {
        self.worker.start().await.expect("Failed to start worker");
    }

    /// Write an upload and return its path.
    pub fn write_input(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join("uploads").join(name);
        std::fs::write(&path, bytes).expect("Failed to write input");
        path
    }

    /// A valid GLB upload.
    pub fn write_glb_input(&self, name: &str) -> (PathBuf, Vec<u8>) {
        let bytes = build_glb(&sample_gltf_json(1, 1, 1), Some(&[0u8; 8]));
        let path = self.write_input(name, &bytes);
        (path, bytes)
    }

    pub fn job_body(
        &self,
        kind: &str,
        file_id: &str,
        conversion_id: &str,
        input: &Path,
        original_filename: &str,
    ) -> Value {
        json!({
            "type": kind,
            "fileId": file_id,
            "conversionId": conversion_id,
            "inputPath": input,
            "originalFilename": original_filename,
        })
    }

    /// Poll the status endpoint until the conversion is terminal.
    pub async fn wait_for_terminal(&self, conversion_id: &str) -> Value {
        let path = format!("/api/v1/conversions/{}", conversion_id);
        for _ in 0..250 {
            let response = self.get(&path).await;
            if response.status == StatusCode::OK {
                let status = response.body["status"].as_str().unwrap_or_default();
                if status == "completed" || status == "failed" {
                    return response.body;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("conversion {} did not finish in time", conversion_id);
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            body,
            bytes: body_bytes.to_vec(),
        }
    }
}

/// Uploads received by [`spawn_remote_store`], as `(fileId, key, body length)`.
pub type RemoteUploads = Arc<std::sync::Mutex<Vec<(String, Option<String>, usize)>>>;

/// Serve `PUT /internal/models/{file_id}` on an ephemeral port, answering every
/// upload with `{"glbUrl": glb_url}`. Returns the base URL.
pub async fn spawn_remote_store(glb_url: &str) -> (String, RemoteUploads) {
    use axum::{
        body::Bytes,
        extract::{Path as UrlPath, State},
        http::HeaderMap,
        routing::put,
        Json,
    };

    let uploads: RemoteUploads = Arc::default();
    let response = json!({ "glbUrl": glb_url });

    let app = Router::new()
        .route(
            "/internal/models/{file_id}",
            put(
                |State((uploads, response)): State<(RemoteUploads, Value)>,
                 UrlPath(file_id): UrlPath<String>,
                 headers: HeaderMap,
                 body: Bytes| async move {
                    let key = headers
                        .get("x-internal-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    uploads.lock().unwrap().push((file_id, key, body.len()));
                    Json(response)
                },
            ),
        )
        .with_state((Arc::clone(&uploads), response));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), uploads)
}
