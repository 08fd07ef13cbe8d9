//! Testing utilities and mock implementations.
//!
//! Mocks stand in for the external tools behind the pipeline's adapter
//! traits, so the worker and the HTTP surface can be exercised without
//! SketchUp, assimp or gltf-pipeline installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use glbforge_core::testing::{MockCompressor, MockExporter, MockMeshConverter};
//!
//! let exporter = Arc::new(MockExporter::new());
//! let converter = Arc::new(MockMeshConverter::new());
//! converter.fail_next(1);
//!
//! let pipeline = ConversionPipeline::new(
//!     exporter.clone(),
//!     converter.clone(),
//!     Arc::new(MockCompressor::new()),
//!     Arc::new(StorageResolver::new(storage_config)?),
//! );
//! ```

mod fixtures;
mod mock_compressor;
mod mock_converter;
mod mock_exporter;

#[cfg(test)]
pub(crate) mod fake_store;

pub use fixtures::{build_glb, sample_gltf_json};
#[cfg(unix)]
pub use fixtures::write_fake_tool;
pub use mock_compressor::MockCompressor;
pub use mock_converter::MockMeshConverter;
pub use mock_exporter::{MockExporter, MOCK_INTERCHANGE};
