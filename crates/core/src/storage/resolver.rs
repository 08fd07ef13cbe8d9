//! Local vs remote artifact storage behind one contract.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{RemoteStore, StorageConfig, StorageError};

/// Which topology stored an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Served from the local output tree.
    Local,
    /// Uploaded to the remote store; local copy discarded.
    Remote,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::Remote => "remote",
        }
    }
}

/// Outcome of storing an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub glb_url: String,
    pub output_path: PathBuf,
    pub storage: StorageKind,
    /// Whether the local output directory must be kept after the job.
    pub retain_local: bool,
}

/// Resolves where a published artifact ends up and under which URL.
pub struct StorageResolver {
    config: StorageConfig,
    remote: Option<RemoteStore>,
}

impl StorageResolver {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let remote = config
            .remote_target()
            .cloned()
            .map(RemoteStore::new)
            .transpose()?;
        Ok(Self { config, remote })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn kind(&self) -> StorageKind {
        if self.remote.is_some() {
            StorageKind::Remote
        } else {
            StorageKind::Local
        }
    }

    pub fn output_dir(&self, file_id: &str) -> PathBuf {
        self.config.output_dir(file_id)
    }

    pub fn artifact_path(&self, file_id: &str) -> PathBuf {
        self.config.artifact_path(file_id)
    }

    /// Checks that need neither the network nor an artifact. Remote mode
    /// without an internal key fails here, before a job does any work.
    pub fn preflight(&self) -> Result<(), StorageError> {
        if self.remote.is_some() && self.config.remote.as_ref().and_then(|r| r.key()).is_none() {
            return Err(StorageError::remote_config(
                "storage.remote.internal_key is required when storage.remote.base_url is set",
            ));
        }
        Ok(())
    }

    /// Resolve a job input and require it to lie under the upload root.
    ///
    /// Symlinks and `..` components are resolved first. An input that does not
    /// exist yet is resolved through its parent directory.
    pub async fn confine_input(&self, input: &Path) -> Result<PathBuf, StorageError> {
        let outside = || StorageError::InputOutsideUploadRoot {
            path: input.to_path_buf(),
        };

        let root = tokio::fs::canonicalize(&self.config.upload_root)
            .await
            .map_err(|_| outside())?;

        let resolved = match tokio::fs::canonicalize(input).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (input.parent(), input.file_name()) else {
                    return Err(outside());
                };
                let parent = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
                tokio::fs::canonicalize(parent)
                    .await
                    .map_err(|_| outside())?
                    .join(name)
            }
            Err(e) => return Err(e.into()),
        };

        if resolved != root && resolved.starts_with(&root) {
            Ok(resolved)
        } else {
            Err(outside())
        }
    }

    /// Store the artifact already published at `artifact`.
    pub async fn store(&self, file_id: &str, artifact: &Path) -> Result<StoredArtifact, StorageError> {
        let local_url = self.config.public_url(file_id);

        let Some(remote) = &self.remote else {
            if !tokio::fs::try_exists(artifact).await? {
                return Err(StorageError::ArtifactMissing {
                    path: artifact.to_path_buf(),
                });
            }
            info!(file_id = %file_id, url = %local_url, "Artifact stored locally");
            return Ok(StoredArtifact {
                glb_url: local_url,
                output_path: artifact.to_path_buf(),
                storage: StorageKind::Local,
                retain_local: true,
            });
        };

        self.preflight()?;

        let bytes = tokio::fs::read(artifact).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::ArtifactMissing {
                    path: artifact.to_path_buf(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;

        let glb_url = remote.upload(file_id, bytes).await?.unwrap_or(local_url);

        Ok(StoredArtifact {
            glb_url,
            output_path: artifact.to_path_buf(),
            storage: StorageKind::Remote,
            retain_local: false,
        })
    }
}
