pub mod compressor;
pub mod config;
pub mod converter;
pub mod exporter;
pub mod queue;
pub mod storage;
pub mod testing;
pub mod validator;
pub mod worker;

pub use compressor::{CompressionOutcome, Compressor, CompressorConfig, DracoCompressor};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use converter::{AssimpConverter, ConverterConfig, ConverterError, MeshConverter};
pub use exporter::{create_exporter, ExportError, Exporter, ExporterBackend, ExporterConfig};
pub use queue::{
    ConversionJob, ConversionResult, JobBroker, JobKind, JobState, JobStatusView, QueueClient,
    QueueConfig, QueueError, QueuedJob,
};
pub use storage::{StorageConfig, StorageError, StorageKind, StorageResolver};
pub use validator::{inspect_glb, validate_file, GlbReport};
pub use worker::{ConversionPipeline, JobWorker, PipelineError, Stage, WorkerStatus};
