//! One execution of a conversion job, stage by stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::compressor::Compressor;
use crate::converter::{copy_sidecars, MeshConversionJob, MeshConverter};
use crate::exporter::{ExportRequest, Exporter};
use crate::queue::{ConversionJob, ConversionResult, JobKind};
use crate::storage::{publish_artifact, PublishedArtifact, StorageResolver, StoredArtifact};
use crate::validator::validate_file;

use super::{
    Attempt, CleanupPlan, Converted, Interchange, KeyedLocks, PipelineError, ScratchContext,
    SourceFile, SourceFormat, Stage,
};

/// Receives stage transitions of a running job.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, stage: Stage);
}

/// Drops every report.
pub struct NoopProgress;

#[async_trait]
impl ProgressReporter for NoopProgress {
    async fn report(&self, _stage: Stage) {}
}

/// Export, convert, validate, compress and store a job's source.
///
/// The pipeline owns the job's input file: it deletes it, together with the
/// scratch directory, once the execution is terminal.
pub struct ConversionPipeline {
    exporter: Arc<dyn Exporter>,
    converter: Arc<dyn MeshConverter>,
    compressor: Arc<dyn Compressor>,
    storage: Arc<StorageResolver>,
    publish_locks: KeyedLocks,
}

impl ConversionPipeline {
    pub fn new(
        exporter: Arc<dyn Exporter>,
        converter: Arc<dyn MeshConverter>,
        compressor: Arc<dyn Compressor>,
        storage: Arc<StorageResolver>,
    ) -> Self {
        Self {
            exporter,
            converter,
            compressor,
            storage,
            publish_locks: KeyedLocks::new(),
        }
    }

    pub fn storage(&self) -> &StorageResolver {
        &self.storage
    }

    pub fn exporter(&self) -> &Arc<dyn Exporter> {
        &self.exporter
    }

    pub fn converter(&self) -> &Arc<dyn MeshConverter> {
        &self.converter
    }

    fn scratch_root(&self) -> &Path {
        &self.storage.config().scratch_root
    }

    /// Run one attempt of `job`, then clean up according to its outcome.
    pub async fn execute(
        &self,
        kind: JobKind,
        job: &ConversionJob,
        attempt: Attempt,
        progress: &dyn ProgressReporter,
    ) -> Result<ConversionResult, PipelineError> {
        let started = Instant::now();

        // Cleanup deletes the input, so an input outside the upload root is
        // refused before anything else and left as it is.
        if let Err(e) = self.storage.confine_input(&job.input_path).await {
            let err = PipelineError::from(e);
            warn!(
                job_id = %job.conversion_id,
                file_id = %job.file_id,
                input = %job.input_path.display(),
                error = %err,
                "Refusing job input"
            );
            return Err(err);
        }

        if let Err(e) = job.validate() {
            let err = PipelineError::from(e);
            self.finish_failure(job, None, attempt, &err).await;
            return Err(err);
        }

        if let Err(e) = self.storage.preflight() {
            let err = PipelineError::from(e);
            self.finish_failure(job, None, attempt, &err).await;
            return Err(err);
        }

        let scratch = ScratchContext::for_job(self.scratch_root(), job);

        info!(
            job_id = %job.conversion_id,
            file_id = %job.file_id,
            kind = %kind,
            attempt = attempt.number,
            max_attempts = attempt.max_attempts,
            "Starting job execution"
        );

        let outcome = match kind {
            JobKind::ConvertSkpToGlb => self.run_convert(job, &scratch, progress).await,
            JobKind::StoreGlb => self.run_store(job, progress).await,
        };

        match outcome {
            Ok(result) => {
                CleanupPlan::after_success()
                    .execute(Some(&scratch), &job.input_path)
                    .await;
                info!(
                    job_id = %job.conversion_id,
                    file_id = %job.file_id,
                    glb_url = %result.glb_url,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Job execution completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.finish_failure(job, Some(&scratch), attempt, &e).await;
                Err(e)
            }
        }
    }

    async fn finish_failure(
        &self,
        job: &ConversionJob,
        scratch: Option<&ScratchContext>,
        attempt: Attempt,
        error: &PipelineError,
    ) {
        let terminal = attempt.is_final() || error.is_permanent();
        warn!(
            job_id = %job.conversion_id,
            file_id = %job.file_id,
            attempt = attempt.number,
            max_attempts = attempt.max_attempts,
            terminal,
            error_kind = error.kind(),
            error = %error,
            "Job execution failed"
        );
        CleanupPlan::after_failure(terminal)
            .execute(scratch, &job.input_path)
            .await;
    }

    async fn run_convert(
        &self,
        job: &ConversionJob,
        scratch: &ScratchContext,
        progress: &dyn ProgressReporter,
    ) -> Result<ConversionResult, PipelineError> {
        require_input(&job.input_path).await?;
        let format = SourceFormat::detect(
            &job.original_filename,
            &job.input_path,
            self.converter.supported_input_formats(),
        )?;
        scratch.create().await?;

        let source = self.stage_source(job, scratch, format).await?;
        debug!(job_id = %job.conversion_id, source = %source.path.display(), "Source staged");

        let converted = match &source.format {
            SourceFormat::Proprietary { .. } => {
                progress.report(Stage::Exporting).await;
                let interchange = self.export(job, scratch, &source).await?;
                progress.report(Stage::Converting).await;
                self.convert(job, scratch, interchange).await?
            }
            SourceFormat::Interchange { .. } => {
                progress.report(Stage::Converting).await;
                let interchange = Interchange {
                    path: source.path.clone(),
                    working_dir: source.working_dir.clone(),
                    texture_dirs: Vec::new(),
                };
                self.convert(job, scratch, interchange).await?
            }
            SourceFormat::Container => Converted {
                glb_path: source.path.clone(),
                texture_dirs: Vec::new(),
            },
        };

        progress.report(Stage::Validating).await;
        let validation = validate_file(&converted.glb_path).await;

        progress.report(Stage::Compressing).await;
        let compression = self.compressor.compress(&converted.glb_path).await;
        debug!(job_id = %job.conversion_id, outcome = ?compression, "Compression step finished");

        progress.report(Stage::Storing).await;
        let (published, stored) = self
            .publish_and_store(&job.file_id, &converted.glb_path, &converted.texture_dirs)
            .await?;

        Ok(ConversionResult {
            glb_url: stored.glb_url,
            output_path: stored.output_path,
            size_bytes: published.size_bytes,
            sha256: published.sha256,
            compressed: compression.is_compressed(),
            storage: stored.storage,
            validation,
        })
    }

    async fn run_store(
        &self,
        job: &ConversionJob,
        progress: &dyn ProgressReporter,
    ) -> Result<ConversionResult, PipelineError> {
        require_input(&job.input_path).await?;

        let validation = validate_file(&job.input_path).await;

        progress.report(Stage::Storing).await;
        let (published, stored) = self
            .publish_and_store(&job.file_id, &job.input_path, &[])
            .await?;

        Ok(ConversionResult {
            glb_url: stored.glb_url,
            output_path: stored.output_path,
            size_bytes: published.size_bytes,
            sha256: published.sha256,
            compressed: false,
            storage: stored.storage,
            validation,
        })
    }

    /// Put the source under its true extension where the stages expect it.
    ///
    /// Containers are always copied into the scratch directory so that
    /// compression never touches the upload.
    async fn stage_source(
        &self,
        job: &ConversionJob,
        scratch: &ScratchContext,
        format: SourceFormat,
    ) -> Result<SourceFile, PipelineError> {
        let in_place = !matches!(format, SourceFormat::Container)
            && job
                .input_path
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(format.extension()))
                .unwrap_or(false);

        if in_place {
            let working_dir = job
                .input_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| scratch.path().to_path_buf());
            return Ok(SourceFile {
                path: job.input_path.clone(),
                format,
                working_dir,
            });
        }

        let staged = match &format {
            SourceFormat::Container => scratch.converted_glb(),
            _ => scratch.source_path(format.extension()),
        };
        tokio::fs::copy(&job.input_path, &staged).await?;
        Ok(SourceFile {
            path: staged,
            format,
            working_dir: scratch.path().to_path_buf(),
        })
    }

    async fn export(
        &self,
        job: &ConversionJob,
        scratch: &ScratchContext,
        source: &SourceFile,
    ) -> Result<Interchange, PipelineError> {
        let output_dir = scratch.export_dir();
        tokio::fs::create_dir_all(&output_dir).await?;

        let output = self
            .exporter
            .export(ExportRequest {
                job_id: job.conversion_id.clone(),
                input_path: source.path.clone(),
                work_dir: scratch.path().to_path_buf(),
                output_dir: output_dir.clone(),
            })
            .await?;

        info!(
            job_id = %job.conversion_id,
            exporter = self.exporter.name(),
            format = self.exporter.interchange_extension(),
            strategy = %output.strategy,
            duration_ms = output.duration_ms,
            "Export finished"
        );

        Ok(Interchange {
            path: output.interchange_path,
            working_dir: output_dir,
            texture_dirs: output.texture_dirs,
        })
    }

    async fn convert(
        &self,
        job: &ConversionJob,
        scratch: &ScratchContext,
        interchange: Interchange,
    ) -> Result<Converted, PipelineError> {
        let result = self
            .converter
            .convert(MeshConversionJob {
                job_id: job.conversion_id.clone(),
                input_path: interchange.path,
                output_path: scratch.converted_glb(),
                working_dir: interchange.working_dir,
            })
            .await?;

        info!(
            job_id = %job.conversion_id,
            converter = self.converter.name(),
            size_bytes = result.output_size_bytes,
            duration_ms = result.duration_ms,
            "Mesh conversion finished"
        );

        Ok(Converted {
            glb_path: result.output_path,
            texture_dirs: interchange.texture_dirs,
        })
    }

    /// Publish into the output tree and hand over to storage.
    ///
    /// Serialized per `file_id`: two conversions of the same file never
    /// interleave their writes, and the last one to publish wins.
    async fn publish_and_store(
        &self,
        file_id: &str,
        artifact: &Path,
        texture_dirs: &[PathBuf],
    ) -> Result<(PublishedArtifact, StoredArtifact), PipelineError> {
        let _guard = self.publish_locks.lock(file_id).await;

        let destination = self.storage.artifact_path(file_id);
        let published = publish_artifact(artifact, &destination).await?;
        if !texture_dirs.is_empty() {
            let copied = copy_sidecars(texture_dirs, &self.storage.output_dir(file_id)).await?;
            debug!(file_id = %file_id, files = copied, "Copied side-car textures");
        }

        let stored = self.storage.store(file_id, &published.path).await?;

        if !stored.retain_local {
            let output_dir = self.storage.output_dir(file_id);
            match tokio::fs::remove_dir_all(&output_dir).await {
                Ok(()) => debug!(path = %output_dir.display(), "Removed local output directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %output_dir.display(), error = %e, "Failed to remove local output directory")
                }
            }
        }

        Ok((published, stored))
    }
}

async fn require_input(path: &Path) -> Result<(), PipelineError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(PipelineError::InputMissing {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::InputMissing {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}
