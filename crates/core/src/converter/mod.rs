//! Converter module for turning interchange files into GLB containers.
//!
//! This module provides the `MeshConverter` trait and an implementation that
//! drives the assimp command-line tool. The converter runs with the job's
//! working directory as its current directory so that relative texture paths
//! in the interchange file resolve.
//!
//! # Example
//!
//! ```ignore
//! use glbforge_core::converter::{AssimpConverter, MeshConverter, MeshConversionJob, copy_sidecars};
//!
//! let converter = AssimpConverter::with_defaults();
//! converter.validate().await?;
//!
//! let result = converter
//!     .convert(MeshConversionJob {
//!         job_id: "conv-1".to_string(),
//!         input_path: scratch.join("export/model.dae"),
//!         output_path: scratch.join("model.glb"),
//!         working_dir: scratch.join("export"),
//!     })
//!     .await?;
//! copy_sidecars(&texture_dirs, &output_dir).await?;
//! ```

mod assimp;
mod config;
mod error;
mod sidecar;
mod traits;
mod types;

pub use assimp::AssimpConverter;
pub use config::ConverterConfig;
pub use error::ConverterError;
pub use sidecar::copy_sidecars;
pub use traits::MeshConverter;
pub use types::{MeshConversionJob, MeshConversionResult};
