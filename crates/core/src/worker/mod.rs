//! Job worker: the per-job state machine and the loops that feed it.
//!
//! A job execution moves through
//! `Queued → Exporting → Converting → Validating → Compressing → Storing → Completed`,
//! skipping the export when the source is not proprietary and the conversion
//! when it already is a GLB container. Validation and compression are side
//! observations; only export, conversion and storage can fail a job.
//!
//! Cleanup is decided from the terminal state alone: scratch and input stay
//! in place across intermediate retries and go once the job has succeeded or
//! run out of attempts.

mod cleanup;
mod error;
mod locks;
mod pipeline;
mod runner;
mod scratch;
mod types;

pub use cleanup::CleanupPlan;
pub use error::PipelineError;
pub use locks::KeyedLocks;
pub use pipeline::{ConversionPipeline, NoopProgress, ProgressReporter};
pub use runner::{JobWorker, WorkerStatus};
pub use scratch::ScratchContext;
pub use types::{
    Attempt, Converted, Interchange, SourceFile, SourceFormat, Stage, CONTAINER_EXTENSION,
    PROPRIETARY_EXTENSIONS,
};
