//! Configuration for artifact storage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of every published artifact.
pub const ARTIFACT_FILE_NAME: &str = "model.glb";

/// Where artifacts are published and how they are served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the servable output tree, `<output_root>/<fileId>/model.glb`.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Root of the per-job scratch directories.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Directory job inputs must live under. The pipeline deletes inputs
    /// once a job is terminal, so nothing outside it is ever accepted.
    #[serde(default = "default_upload_root")]
    pub upload_root: PathBuf,

    /// URL prefix under which `output_root` is served.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    /// Remote upload target. Local mode when absent.
    #[serde(default)]
    pub remote: Option<RemoteStoreConfig>,
}

/// Remote artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    /// Base URL, e.g. `https://api.example.com`.
    pub base_url: String,

    /// Sent as `x-internal-api-key`. Required for uploads.
    #[serde(default)]
    pub internal_key: Option<String>,

    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("data/models")
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("glbforge")
}

fn default_upload_root() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_public_prefix() -> String {
    "/models".to_string()
}

fn default_remote_timeout() -> u64 {
    120
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            scratch_root: default_scratch_root(),
            upload_root: default_upload_root(),
            public_prefix: default_public_prefix(),
            remote: None,
        }
    }
}

impl StorageConfig {
    /// Local-mode config rooted at the given directories.
    pub fn local(output_root: impl Into<PathBuf>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            scratch_root: scratch_root.into(),
            ..Default::default()
        }
    }

    pub fn with_upload_root(mut self, upload_root: impl Into<PathBuf>) -> Self {
        self.upload_root = upload_root.into();
        self
    }

    pub fn with_remote(mut self, remote: RemoteStoreConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Remote mode is selected by a non-empty base URL.
    pub fn remote_target(&self) -> Option<&RemoteStoreConfig> {
        self.remote
            .as_ref()
            .filter(|r| !r.base_url.trim().is_empty())
    }

    pub fn output_dir(&self, file_id: &str) -> PathBuf {
        self.output_root.join(file_id)
    }

    pub fn artifact_path(&self, file_id: &str) -> PathBuf {
        self.output_dir(file_id).join(ARTIFACT_FILE_NAME)
    }

    /// Locally derived public URL of an artifact.
    pub fn public_url(&self, file_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_prefix.trim_end_matches('/'),
            file_id,
            ARTIFACT_FILE_NAME
        )
    }
}

impl RemoteStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            internal_key: None,
            timeout_secs: default_remote_timeout(),
        }
    }

    pub fn with_internal_key(mut self, key: impl Into<String>) -> Self {
        self.internal_key = Some(key.into());
        self
    }

    /// The internal key, if set and non-blank.
    pub fn key(&self) -> Option<&str> {
        self.internal_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
