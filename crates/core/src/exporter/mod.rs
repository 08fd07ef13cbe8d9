//! Export stage: proprietary 3D sources into an interchange format.
//!
//! The authoring application is a GUI program, so exporting is a matter of
//! launching it with the right arguments and a generated startup script. The
//! argument forms it accepts vary between releases, hence the ordered list of
//! [`InvocationStrategy`] values tried until one produces output.
//!
//! # Example
//!
//! ```ignore
//! use glbforge_core::exporter::{create_exporter, ExportRequest, ExporterConfig};
//!
//! let exporter = create_exporter(&ExporterConfig::default().with_sketchup_path(app));
//! let output = exporter
//!     .export(ExportRequest {
//!         job_id: "conv-1".to_string(),
//!         input_path: scratch.join("source.skp"),
//!         work_dir: scratch.clone(),
//!         output_dir: scratch.join("export"),
//!     })
//!     .await?;
//! println!("{} via {}", output.interchange_path.display(), output.strategy);
//! ```

mod config;
mod error;
mod script;
mod sdk;
mod sketchup;
mod strategy;
mod traits;

pub use config::{ExporterBackend, ExporterConfig};
pub use error::{AttemptFailure, ExportError, StrategyFailure};
pub use script::render_export_script;
pub use sdk::SdkExporter;
pub use sketchup::SketchupExporter;
pub use strategy::{run_strategies, InvocationStrategy, StrategyRun};
pub use traits::{ExportOutput, ExportRequest, Exporter};

use std::sync::Arc;

/// Build the exporter selected by `config.backend`.
pub fn create_exporter(config: &ExporterConfig) -> Arc<dyn Exporter> {
    match config.backend {
        ExporterBackend::Sketchup => Arc::new(SketchupExporter::new(config.clone())),
        ExporterBackend::Sdk => Arc::new(SdkExporter::new(config.clone())),
    }
}
