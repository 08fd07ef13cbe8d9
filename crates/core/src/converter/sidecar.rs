//! Copying texture folders next to the converted artifact.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::ConverterError;

/// Recursively copy each directory into `dest_root`, keeping its name.
///
/// Returns the number of files copied.
pub async fn copy_sidecars(dirs: &[PathBuf], dest_root: &Path) -> Result<u64, ConverterError> {
    let dirs = dirs.to_vec();
    let dest_root = dest_root.to_path_buf();
    tokio::task::spawn_blocking(move || copy_sidecars_blocking(&dirs, &dest_root))
        .await
        .map_err(|e| ConverterError::Io(std::io::Error::other(e)))?
}

fn copy_sidecars_blocking(dirs: &[PathBuf], dest_root: &Path) -> Result<u64, ConverterError> {
    let mut copied = 0u64;

    for dir in dirs {
        let Some(name) = dir.file_name() else {
            continue;
        };
        let target_root = dest_root.join(name);
        let fail = |reason: String| ConverterError::SidecarCopyFailed {
            path: dir.clone(),
            reason,
        };

        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(|e| fail(e.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| fail(e.to_string()))?;
            let target = target_root.join(relative);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target).map_err(|e| fail(e.to_string()))?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
                }
                std::fs::copy(entry.path(), &target).map_err(|e| fail(e.to_string()))?;
                copied += 1;
            }
        }

        debug!(source = %dir.display(), target = %target_root.display(), "Copied side-car directory");
    }

    Ok(copied)
}
