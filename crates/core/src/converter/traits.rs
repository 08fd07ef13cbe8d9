//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::{MeshConversionJob, MeshConversionResult};

/// A converter that turns interchange files into GLB containers.
#[async_trait]
pub trait MeshConverter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts one interchange file.
    async fn convert(&self, job: MeshConversionJob)
        -> Result<MeshConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Returns the supported input extensions.
    fn supported_input_formats(&self) -> &[&str] {
        &["dae", "obj", "fbx", "gltf", "3ds", "stl", "ply"]
    }
}
