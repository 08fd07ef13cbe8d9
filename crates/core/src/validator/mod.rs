//! Advisory validation of produced GLB containers.
//!
//! Validation never fails a job: problems are logged and the report is
//! attached to the result when one could be produced.

mod glb;

pub use glb::{
    inspect_glb, GlbChunk, GlbError, GlbReport, CHUNK_TYPE_BIN, CHUNK_TYPE_JSON, GLB_MAGIC,
    GLB_VERSION,
};

use std::path::Path;

use tracing::{info, warn};

/// Read and inspect a GLB file.
pub async fn inspect_file(path: &Path) -> Result<GlbReport, GlbError> {
    let bytes = tokio::fs::read(path).await?;
    inspect_glb(&bytes)
}

/// Inspect a GLB file, logging instead of failing.
pub async fn validate_file(path: &Path) -> Option<GlbReport> {
    match inspect_file(path).await {
        Ok(report) => {
            if report.has_missing_textures() {
                warn!(
                    path = %path.display(),
                    textured_materials = report.textured_material_count,
                    "GLB materials reference textures but no images are embedded"
                );
            }
            if !report.external_image_uris.is_empty() {
                warn!(
                    path = %path.display(),
                    uris = ?report.external_image_uris,
                    "GLB references external images"
                );
            }
            info!(
                path = %path.display(),
                images = report.image_count,
                materials = report.material_count,
                textured_materials = report.textured_material_count,
                "GLB validated"
            );
            Some(report)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "GLB validation failed");
            None
        }
    }
}
