//! Copying artifacts into the output tree.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use super::StorageError;

const BUFFER_SIZE: usize = 64 * 1024;

/// An artifact copied into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Hex SHA-256 of the published bytes.
    pub sha256: String,
}

/// Copy `source` to `destination`, hashing as it streams.
///
/// The copy is written to a sibling temp file, re-hashed from disk and only
/// then renamed over `destination`, so readers never see a partial artifact.
pub async fn publish_artifact(
    source: &Path,
    destination: &Path,
) -> Result<PublishedArtifact, StorageError> {
    let source_file = File::open(source).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::ArtifactMissing {
                path: source.to_path_buf(),
            }
        } else {
            StorageError::Io(e)
        }
    })?;

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = temp_sibling(destination);

    let copied = async {
        let dest_file = File::create(&temp_path).await?;
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, source_file);
        let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest_file);
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut total_bytes = 0u64;

        loop {
            let bytes_read = reader.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
            writer.write_all(&buffer[..bytes_read]).await?;
            total_bytes += bytes_read as u64;
        }
        writer.flush().await?;
        writer.get_ref().sync_all().await?;

        Ok::<_, std::io::Error>((total_bytes, format!("{:x}", hasher.finalize())))
    }
    .await;

    let (size_bytes, expected) = match copied {
        Ok(v) => v,
        Err(e) => {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
    };

    let actual = sha256_file(&temp_path).await?;
    if actual != expected {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(StorageError::ChecksumMismatch {
            path: destination.to_path_buf(),
            expected,
            actual,
        });
    }

    tokio::fs::rename(&temp_path, destination).await?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        size_bytes,
        "Published artifact"
    );

    Ok(PublishedArtifact {
        path: destination.to_path_buf(),
        size_bytes,
        sha256: actual,
    })
}

/// Hex SHA-256 of a file.
pub async fn sha256_file(path: &Path) -> Result<String, StorageError> {
    let file = File::open(path).await?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    path.with_file_name(format!(".{}.{}.partial", name, uuid::Uuid::new_v4().simple()))
}
