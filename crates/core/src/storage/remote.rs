//! Upload client for the remote artifact store.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use super::{RemoteStoreConfig, StorageError};

/// Header carrying the shared secret.
pub const INTERNAL_KEY_HEADER: &str = "x-internal-api-key";
pub const GLB_CONTENT_TYPE: &str = "model/gltf-binary";

/// Client for `PUT <base>/internal/models/<fileId>`.
pub struct RemoteStore {
    client: Client,
    config: RemoteStoreConfig,
}

impl RemoteStore {
    pub fn new(config: RemoteStoreConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn upload_url(&self, file_id: &str) -> String {
        format!(
            "{}/internal/models/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(file_id)
        )
    }

    /// Upload the artifact bytes. Returns the store's `glbUrl` when it sent a
    /// usable one.
    pub async fn upload(&self, file_id: &str, bytes: Vec<u8>) -> Result<Option<String>, StorageError> {
        let key = self
            .config
            .key()
            .ok_or_else(|| StorageError::remote_config("internal key is not set"))?;
        let url = self.upload_url(file_id);
        let size = bytes.len();

        debug!(url = %url, size, "Uploading artifact");

        let response = self
            .client
            .put(&url)
            .header(INTERNAL_KEY_HEADER, key)
            .header(reqwest::header::CONTENT_TYPE, GLB_CONTENT_TYPE)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(StorageError::RemoteStoreFailure {
                status: status.as_u16(),
                body,
            });
        }

        let glb_url = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("glbUrl").and_then(|u| u.as_str()).map(str::to_string))
            .filter(|u| !u.trim().is_empty());

        info!(
            file_id = %file_id,
            status = status.as_u16(),
            remote_url = glb_url.as_deref().unwrap_or("<none>"),
            "Uploaded artifact to remote store"
        );

        Ok(glb_url)
    }
}
