//! In-process stand-in for the remote model store.

use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::put,
    Json, Router,
};

use crate::storage::INTERNAL_KEY_HEADER;

/// One upload as the store saw it.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub file_id: String,
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub type Uploads = Arc<Mutex<Vec<ReceivedUpload>>>;

#[derive(Clone)]
struct FakeStore {
    received: Uploads,
    status: StatusCode,
    response: serde_json::Value,
}

async fn handle_put(
    State(store): State<FakeStore>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    store.received.lock().unwrap().push(ReceivedUpload {
        file_id,
        key: header(INTERNAL_KEY_HEADER),
        content_type: header("content-type"),
        body: body.to_vec(),
    });
    (store.status, Json(store.response.clone()))
}

/// Serve `PUT /internal/models/{file_id}` on an ephemeral port, answering
/// every upload with `status` and `response`. Returns the base URL.
pub async fn spawn_fake_store(status: StatusCode, response: serde_json::Value) -> (String, Uploads) {
    let received: Uploads = Arc::new(Mutex::new(Vec::new()));
    let state = FakeStore {
        received: Arc::clone(&received),
        status,
        response,
    };
    let app = Router::new()
        .route("/internal/models/{file_id}", put(handle_put))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), received)
}
