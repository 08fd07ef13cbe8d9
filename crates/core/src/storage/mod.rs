//! Artifact publishing and storage.
//!
//! Artifacts are first published into `<output_root>/<fileId>/model.glb`.
//! The [`StorageResolver`] then either serves that file locally or uploads it
//! to the remote store and reports that the local copy can go.
//!
//! # Example
//!
//! ```ignore
//! use glbforge_core::storage::{publish_artifact, StorageConfig, StorageResolver};
//!
//! let resolver = StorageResolver::new(StorageConfig::default())?;
//! let published = publish_artifact(&converted, &resolver.artifact_path("file-1")).await?;
//! let stored = resolver.store("file-1", &published.path).await?;
//! println!("{}", stored.glb_url);
//! ```

mod config;
mod error;
mod publish;
mod remote;
mod resolver;

pub use config::{RemoteStoreConfig, StorageConfig, ARTIFACT_FILE_NAME};
pub use error::StorageError;
pub use publish::{publish_artifact, sha256_file, PublishedArtifact};
pub use remote::{RemoteStore, GLB_CONTENT_TYPE, INTERNAL_KEY_HEADER};
pub use resolver::{StorageKind, StorageResolver, StoredArtifact};
